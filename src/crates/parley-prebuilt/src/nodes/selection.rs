//! SelectionNode - applies the in-band selection and picks the turn's first branch

use crate::selection::{route_selection, SelectionDecision, SelectionPattern};
use async_trait::async_trait;
use parley_core::command::Goto;
use parley_core::messages::Message;
use parley_core::node::{Node, NodeContext};
use parley_core::state::{ConversationState, StateDelta};
use parley_core::{NodeOutcome, Result};
use tracing::info;

/// Where each selection decision continues
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionTargets {
    /// Run together when the selection changed
    pub recompute: Vec<String>,
    pub reuse: String,
    pub clarify: String,
}

#[derive(Debug, Clone)]
pub struct SelectionNode {
    pattern: SelectionPattern,
    targets: SelectionTargets,
}

impl SelectionNode {
    pub fn new(pattern: SelectionPattern, targets: SelectionTargets) -> Self {
        Self { pattern, targets }
    }

    pub fn targets(&self) -> &SelectionTargets {
        &self.targets
    }
}

#[async_trait]
impl Node<ConversationState> for SelectionNode {
    async fn run(&self, state: &ConversationState, ctx: &NodeContext) -> Result<NodeOutcome<StateDelta>> {
        let (message_id, selection, goto) = match route_selection(state, &self.pattern) {
            SelectionDecision::Clarify => {
                info!(thread_id = %ctx.thread_id, "No office selection in message");
                return Ok(NodeOutcome::goto(
                    StateDelta::new(),
                    Goto::Node(self.targets.clarify.clone()),
                ));
            }
            SelectionDecision::Recompute {
                message_id,
                selection,
            } => {
                info!(thread_id = %ctx.thread_id, entities = ?selection.entities, "Office selection changed");
                (message_id, selection, Goto::Nodes(self.targets.recompute.clone()))
            }
            SelectionDecision::Reuse {
                message_id,
                selection,
            } => {
                info!(thread_id = %ctx.thread_id, "Office selection unchanged, keeping context");
                (message_id, selection, Goto::Node(self.targets.reuse.clone()))
            }
        };

        // Re-append the human message without the selection phrase, keeping its id
        let mut cleaned = state
            .messages
            .iter()
            .find(|m| m.id() == message_id)
            .cloned()
            .unwrap_or_else(|| Message::human("").with_id(&message_id));
        cleaned.set_content(selection.cleaned);

        let delta = StateDelta::new()
            .with_removal(message_id)
            .with_message(cleaned)
            .with_selected_entities(selection.entities);

        Ok(NodeOutcome::goto(delta, goto))
    }
}
