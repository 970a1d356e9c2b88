//! ClarificationNode - asks the user to select entities and ends the turn

use crate::prompts::CLARIFICATION_MESSAGE;
use async_trait::async_trait;
use parley_core::command::Goto;
use parley_core::messages::Message;
use parley_core::node::{Node, NodeContext};
use parley_core::state::{ConversationState, StateDelta};
use parley_core::{NodeOutcome, Result};

/// Replies with a fixed message, clears the selection context and ends the turn.
/// No model or tool is called.
#[derive(Debug, Clone)]
pub struct ClarificationNode {
    message: String,
}

impl Default for ClarificationNode {
    fn default() -> Self {
        Self::new(CLARIFICATION_MESSAGE)
    }
}

impl ClarificationNode {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Node<ConversationState> for ClarificationNode {
    async fn run(&self, _state: &ConversationState, _ctx: &NodeContext) -> Result<NodeOutcome<StateDelta>> {
        let delta = StateDelta::append(Message::ai(&self.message)).reset_context();
        Ok(NodeOutcome::goto(delta, Goto::End))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::config::RunConfig;
    use parley_core::GraphState;

    #[tokio::test]
    async fn test_replies_and_resets() {
        let mut state = ConversationState {
            messages: vec![Message::human("hola")],
            selected_entities: vec!["A".into()],
            derived_context: "ctx".into(),
            guidance: "g".into(),
            ..Default::default()
        };
        let ctx = NodeContext::new("request_selection", RunConfig::new("t1"));

        let NodeOutcome::Continue(command) = ClarificationNode::default().run(&state, &ctx).await.unwrap() else {
            panic!("Expected continue");
        };
        assert_eq!(command.goto, Goto::End);

        state.apply(command.update).unwrap();
        assert_eq!(state.last_message().unwrap().content(), CLARIFICATION_MESSAGE);
        assert!(state.selected_entities.is_empty());
        assert!(state.derived_context.is_empty());
        assert!(state.guidance.is_empty());
    }
}
