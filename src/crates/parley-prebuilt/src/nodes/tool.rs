//! ToolNode - dispatches the tool calls of the last AI message
//!
//! ```text
//!   [.., ai{tool_calls: [c1, c2, AskHuman]}]
//!                │
//!                ↓ ToolNode (c1 and c2 run concurrently, AskHuman skipped)
//!   [.., ai{..}, tool{c1}, tool{c2}]
//! ```
//!
//! Every dispatched call yields exactly one tool-result message with the matching
//! `tool_call_id`, in call order. Unknown tools, invalid arguments, returned errors and panics
//! all become tool-result content; the node itself never fails the turn.

use async_trait::async_trait;
use parley_core::messages::{Message, ToolCall};
use parley_core::node::{Node, NodeContext};
use parley_core::state::{ConversationState, StateDelta};
use parley_core::tool::{ToolRegistry, ASK_HUMAN_TOOL};
use parley_core::{NodeOutcome, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ToolNode {
    registry: Arc<ToolRegistry>,
    skip: HashSet<String>,
}

impl ToolNode {
    /// Tool node that leaves `AskHuman` calls to the human-input node
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            skip: HashSet::from([ASK_HUMAN_TOOL.to_string()]),
        }
    }

    /// Tool node that dispatches every call, `AskHuman` included
    pub fn dispatch_all(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            skip: HashSet::new(),
        }
    }

    pub fn skip_tool(mut self, name: impl Into<String>) -> Self {
        self.skip.insert(name.into());
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    fn pending_calls<'a>(&self, state: &'a ConversationState) -> Vec<&'a ToolCall> {
        let Some(ai) = state.messages.iter().rev().find(|m| m.has_tool_calls()) else {
            return Vec::new();
        };

        ai.tool_calls()
            .iter()
            .filter(|call| !self.skip.contains(&call.name))
            .collect()
    }

    /// Run the dispatched calls concurrently; results come back in call order
    pub async fn execute(&self, state: &ConversationState) -> Vec<Message> {
        let calls = self.pending_calls(state);
        debug!(count = calls.len(), "Dispatching tool calls");

        let futures = calls
            .into_iter()
            .map(|call| self.registry.execute_tool_call(call));

        futures::future::join_all(futures)
            .await
            .into_iter()
            .map(|result| result.into_message())
            .collect()
    }
}

#[async_trait]
impl Node<ConversationState> for ToolNode {
    async fn run(&self, state: &ConversationState, _ctx: &NodeContext) -> Result<NodeOutcome<StateDelta>> {
        let mut delta = StateDelta::new();
        for message in self.execute(state).await {
            delta = delta.with_message(message);
        }
        Ok(NodeOutcome::update(delta))
    }
}
