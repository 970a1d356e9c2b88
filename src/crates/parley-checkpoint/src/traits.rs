//! The [`CheckpointSaver`] trait implemented by every storage backend

use crate::{
    checkpoint::{Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointTuple},
    error::Result,
    locks::ThreadGuard,
};
use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;

/// Stream of checkpoints, newest first
pub type CheckpointStream =
    Pin<Box<dyn Stream<Item = Result<CheckpointTuple>> + Send + 'static>>;

/// Storage for per-thread checkpoint histories.
///
/// Implementations must make `put` atomic per thread: a reader sees either the previous
/// head or the new one, never a partial write. `lock_thread` hands out the per-thread lock
/// the graph engine holds for the duration of a turn or resume.
#[async_trait]
pub trait CheckpointSaver: Send + Sync {
    /// Fetch a checkpoint (the thread head unless `checkpoint_id` is set)
    async fn get(&self, config: &CheckpointConfig) -> Result<Option<Checkpoint>> {
        Ok(self.get_tuple(config).await?.map(|tuple| tuple.checkpoint))
    }

    /// Fetch a checkpoint together with its config and metadata
    async fn get_tuple(&self, config: &CheckpointConfig) -> Result<Option<CheckpointTuple>>;

    /// List a thread's checkpoints, newest first
    async fn list(&self, config: &CheckpointConfig, limit: Option<usize>)
        -> Result<CheckpointStream>;

    /// Store a new head for the thread named in `config`.
    ///
    /// Returns the config addressing the stored checkpoint.
    async fn put(
        &self,
        config: &CheckpointConfig,
        checkpoint: Checkpoint,
        metadata: CheckpointMetadata,
    ) -> Result<CheckpointConfig>;

    /// Remove every checkpoint of a thread
    async fn delete_thread(&self, thread_id: &str) -> Result<()>;

    /// Take the thread's exclusive execution lock
    async fn lock_thread(&self, thread_id: &str) -> ThreadGuard;
}
