//! UpdateGuidanceNode - hands the guidance stage's prompt to the analyst

use async_trait::async_trait;
use parley_core::command::Goto;
use parley_core::node::{Node, NodeContext};
use parley_core::state::{ConversationState, StateDelta};
use parley_core::{NodeOutcome, Result};
use tracing::debug;

/// Stores the last tool result as `guidance` and continues to `next`.
///
/// Ends the turn when there is no non-empty tool result or no selection to analyse.
#[derive(Debug, Clone)]
pub struct UpdateGuidanceNode {
    next: String,
}

impl UpdateGuidanceNode {
    pub fn new(next: impl Into<String>) -> Self {
        Self { next: next.into() }
    }
}

#[async_trait]
impl Node<ConversationState> for UpdateGuidanceNode {
    async fn run(&self, state: &ConversationState, ctx: &NodeContext) -> Result<NodeOutcome<StateDelta>> {
        let guidance = state
            .last_message()
            .filter(|m| m.is_tool())
            .map(|m| m.content().trim())
            .filter(|content| !content.is_empty());

        match guidance {
            Some(guidance) if !state.selected_entities.is_empty() => {
                debug!(thread_id = %ctx.thread_id, "Guidance updated");
                Ok(NodeOutcome::goto(
                    StateDelta::new().with_guidance(guidance),
                    Goto::Node(self.next.clone()),
                ))
            }
            _ => Ok(NodeOutcome::end()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::config::RunConfig;
    use parley_core::messages::Message;

    fn state(last: Message, selected: &[&str]) -> ConversationState {
        ConversationState {
            messages: vec![Message::human("dame el SLA de enero"), last],
            selected_entities: selected.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    async fn run(state: &ConversationState) -> NodeOutcome<StateDelta> {
        let ctx = NodeContext::new("update_guidance", RunConfig::new("t1"));
        UpdateGuidanceNode::new("analyst_agent").run(state, &ctx).await.unwrap()
    }

    #[tokio::test]
    async fn test_hands_off_to_analyst() {
        let outcome = run(&state(Message::tool(" Entrega el SLA de enero ", "c1"), &["A"])).await;
        assert_eq!(
            outcome,
            NodeOutcome::goto(
                StateDelta::new().with_guidance("Entrega el SLA de enero"),
                Goto::Node("analyst_agent".into())
            )
        );
    }

    #[tokio::test]
    async fn test_ends_without_usable_guidance() {
        assert_eq!(run(&state(Message::tool("", "c1"), &["A"])).await, NodeOutcome::end());
        assert_eq!(run(&state(Message::ai("hola"), &["A"])).await, NodeOutcome::end());
        assert_eq!(run(&state(Message::tool("x", "c1"), &[])).await, NodeOutcome::end());
    }
}
