//! The CompiledGraph type and its configuration

use crate::builder::GraphSpec;
use crate::state::GraphState;
use parley_checkpoint::{CheckpointSaver, InMemoryCheckpointSaver};
use std::sync::Arc;

/// Validated graph ready to run turns
pub struct CompiledGraph<S: GraphState> {
    pub(crate) spec: Arc<GraphSpec<S>>,
    pub(crate) checkpointer: Arc<dyn CheckpointSaver>,
}

impl<S: GraphState> Clone for CompiledGraph<S> {
    fn clone(&self) -> Self {
        Self {
            spec: self.spec.clone(),
            checkpointer: self.checkpointer.clone(),
        }
    }
}

impl<S: GraphState> CompiledGraph<S> {
    pub(crate) fn new(spec: GraphSpec<S>) -> Self {
        Self {
            spec: Arc::new(spec),
            checkpointer: Arc::new(InMemoryCheckpointSaver::new()),
        }
    }

    /// Replace the default in-memory checkpoint store
    pub fn with_checkpointer(mut self, saver: Arc<dyn CheckpointSaver>) -> Self {
        self.checkpointer = saver;
        self
    }

    pub fn checkpointer(&self) -> &Arc<dyn CheckpointSaver> {
        &self.checkpointer
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.spec.index.contains_key(name)
    }

    /// Node names in declaration order
    pub fn node_names(&self) -> Vec<&str> {
        self.spec.nodes.iter().map(|n| n.name.as_str()).collect()
    }

    pub fn recursion_limit(&self) -> usize {
        self.spec.limits.recursion_limit
    }
}
