//! Event streaming for a running turn

use super::types::TurnInput;
use super::CompiledGraph;
use crate::config::RunConfig;
use crate::state::GraphState;
use crate::stream::GraphEventStream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::Instrument;

impl<S: GraphState> CompiledGraph<S> {
    /// Run an invocation in the background and stream its events.
    ///
    /// The turn keeps running if the stream is dropped; its checkpoints are written either
    /// way. A failure is delivered as the final `Err` item.
    pub fn stream(
        &self,
        input: TurnInput<S::Update>,
        config: RunConfig,
    ) -> GraphEventStream<S, S::Update> {
        let (tx, rx) = mpsc::unbounded_channel();
        let graph = self.clone();
        let span = tracing::info_span!("stream", thread_id = %config.thread_id, run_id = %config.run_id);

        tokio::spawn(
            async move {
                if let Err(err) = graph.run(input, &config, Some(&tx)).await {
                    let _ = tx.send(Err(err));
                }
            }
            .instrument(span),
        );

        Box::pin(UnboundedReceiverStream::new(rx))
    }
}
