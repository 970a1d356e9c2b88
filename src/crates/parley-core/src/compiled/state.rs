//! Thread state inspection and external updates

use super::types::{StateSnapshot, StateSnapshotStream};
use super::CompiledGraph;
use crate::error::Result;
use crate::state::GraphState;
use futures::StreamExt;
use parley_checkpoint::{Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointSource};

impl<S: GraphState> CompiledGraph<S> {
    /// Latest snapshot of a thread, `None` if the thread has never run
    pub async fn get_state(&self, thread_id: &str) -> Result<Option<StateSnapshot<S>>> {
        let tuple = self
            .checkpointer
            .get_tuple(&CheckpointConfig::for_thread(thread_id))
            .await?;
        tuple.map(StateSnapshot::from_tuple).transpose()
    }

    /// Snapshots of a thread, newest first
    pub async fn get_state_history(
        &self,
        thread_id: &str,
        limit: Option<usize>,
    ) -> Result<StateSnapshotStream<S>> {
        let tuples = self
            .checkpointer
            .list(&CheckpointConfig::for_thread(thread_id), limit)
            .await?;

        Ok(Box::pin(tuples.map(|item| {
            item.map_err(Into::into)
                .and_then(StateSnapshot::from_tuple)
        })))
    }

    /// Apply `update` to the thread's state without running any node.
    ///
    /// The pending suspension and scheduled nodes are kept as they are.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_state(&self, thread_id: &str, update: S::Update) -> Result<StateSnapshot<S>> {
        let _guard = self.checkpointer.lock_thread(thread_id).await;
        let config = CheckpointConfig::for_thread(thread_id);

        let head = self.checkpointer.get(&config).await?;
        let (mut state, step, next, interrupt) = match head {
            Some(head) => (
                serde_json::from_value::<S>(head.values)?,
                head.step + 1,
                head.next,
                head.pending_interrupt,
            ),
            None => (S::default(), 0, Vec::new(), None),
        };

        state.apply(update)?;

        let mut checkpoint = Checkpoint::new(serde_json::to_value(&state)?, step).with_next(next);
        checkpoint.pending_interrupt = interrupt;
        self.checkpointer
            .put(
                &config,
                checkpoint,
                CheckpointMetadata::new()
                    .with_source(CheckpointSource::Update)
                    .with_step(step),
            )
            .await?;

        let tuple = self.checkpointer.get_tuple(&config).await?.ok_or_else(|| {
            crate::error::GraphError::State(format!("thread '{}' vanished during update", thread_id))
        })?;
        StateSnapshot::from_tuple(tuple)
    }

    /// Forget a thread entirely
    pub async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let _guard = self.checkpointer.lock_thread(thread_id).await;
        self.checkpointer.delete_thread(thread_id).await?;
        tracing::info!(thread_id, "Thread deleted");
        Ok(())
    }
}
