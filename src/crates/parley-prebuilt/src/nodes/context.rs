//! ContextNode - rebuilds the derived context for the current selection

use crate::prompts::CONTEXT_HEADER;
use async_trait::async_trait;
use parley_core::node::{Node, NodeContext};
use parley_core::state::{normalize_selection, ConversationState, StateDelta};
use parley_core::{GraphError, NodeOutcome, Result};
use std::future::Future;
use std::sync::Arc;
use tracing::info;

/// External source of per-entity context text
#[async_trait]
pub trait ContextLookup: Send + Sync {
    /// `entities` arrive sorted and de-duplicated
    async fn lookup(&self, entities: &[String]) -> std::result::Result<String, String>;
}

#[async_trait]
impl<F, Fut> ContextLookup for F
where
    F: Fn(Vec<String>) -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<String, String>> + Send,
{
    async fn lookup(&self, entities: &[String]) -> std::result::Result<String, String> {
        self(entities.to_vec()).await
    }
}

/// Render the derived context for a lookup result
pub fn format_context(lookup: &str) -> String {
    format!("{} {}", CONTEXT_HEADER, lookup)
}

#[derive(Clone)]
pub struct ContextNode {
    lookup: Arc<dyn ContextLookup>,
}

impl ContextNode {
    pub fn new(lookup: Arc<dyn ContextLookup>) -> Self {
        Self { lookup }
    }
}

impl std::fmt::Debug for ContextNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextNode").finish_non_exhaustive()
    }
}

#[async_trait]
impl Node<ConversationState> for ContextNode {
    async fn run(&self, state: &ConversationState, ctx: &NodeContext) -> Result<NodeOutcome<StateDelta>> {
        let entities = normalize_selection(&state.selected_entities);
        info!(thread_id = %ctx.thread_id, entities = ?entities, "Recomputing context");

        let text = self
            .lookup
            .lookup(&entities)
            .await
            .map_err(|e| GraphError::node_execution(&ctx.node, e))?;

        Ok(NodeOutcome::update(
            StateDelta::new().with_context_for(entities, format_context(&text)),
        ))
    }
}
