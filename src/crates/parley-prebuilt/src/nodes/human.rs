//! HumanInputNode - answers `AskHuman` calls with the human's reply
//!
//! On first entry the node suspends the turn with the call's question. When the thread is
//! resumed the engine re-enters the node with the answer, which becomes the tool-result
//! message for the original call id. When the same AI message carries further `AskHuman`
//! calls, the node routes back to itself and suspends again for the next one, so the model
//! only runs once every call has a result.

use crate::prompts::DEFAULT_HUMAN_PROMPT;
use async_trait::async_trait;
use parley_core::command::Goto;
use parley_core::llm::ToolDefinition;
use parley_core::messages::{Message, ToolCall};
use parley_core::node::{Node, NodeContext};
use parley_core::state::{ConversationState, StateDelta};
use parley_core::tool::{ask_human_question, ASK_HUMAN_TOOL};
use parley_core::{GraphError, NodeOutcome, Result};
use serde_json::json;
use tracing::{debug, info};

/// Ask-human definition whose argument is `question_for_human`
pub fn question_for_human_definition() -> ToolDefinition {
    ToolDefinition::new(
        ASK_HUMAN_TOOL,
        "El agente debe solicitar directamente el periodo de tiempo al usuario",
        json!({
            "type": "object",
            "properties": {
                "question_for_human": {"type": "string"}
            },
            "required": ["question_for_human"]
        }),
    )
}

#[derive(Debug, Clone)]
pub struct HumanInputNode {
    default_prompt: String,
    prefer_default: bool,
}

impl Default for HumanInputNode {
    fn default() -> Self {
        Self::new(DEFAULT_HUMAN_PROMPT)
    }
}

impl HumanInputNode {
    /// `default_prompt` is used when the call carries no question
    pub fn new(default_prompt: impl Into<String>) -> Self {
        Self {
            default_prompt: default_prompt.into(),
            prefer_default: false,
        }
    }

    /// Always show the default prompt, ignoring the model's question
    pub fn always_default(mut self) -> Self {
        self.prefer_default = true;
        self
    }

    /// Unanswered `AskHuman` calls of the latest AI message with tool calls, in call order
    fn pending_calls<'a>(&self, state: &'a ConversationState) -> Vec<&'a ToolCall> {
        let Some(ai) = state.messages.iter().rev().find(|m| m.has_tool_calls()) else {
            return Vec::new();
        };
        ai.tool_calls()
            .iter()
            .filter(|call| {
                call.name == ASK_HUMAN_TOOL
                    && !state
                        .messages
                        .iter()
                        .any(|m| m.tool_call_id() == Some(call.id.as_str()))
            })
            .collect()
    }

    pub fn prompt_for(&self, call: &ToolCall) -> String {
        if self.prefer_default {
            return self.default_prompt.clone();
        }
        ask_human_question(call)
            .map(String::from)
            .unwrap_or_else(|| self.default_prompt.clone())
    }
}

#[async_trait]
impl Node<ConversationState> for HumanInputNode {
    async fn run(&self, state: &ConversationState, ctx: &NodeContext) -> Result<NodeOutcome<StateDelta>> {
        let pending = self.pending_calls(state);
        let call = *pending.first().ok_or_else(|| {
            GraphError::node_execution(&ctx.node, "no unanswered AskHuman call in the conversation")
        })?;

        match ctx.resume_string() {
            None => {
                let prompt = self.prompt_for(call);
                info!(thread_id = %ctx.thread_id, call_id = %call.id, "Asking the human");
                Ok(NodeOutcome::suspend(prompt))
            }
            Some(answer) => {
                debug!(thread_id = %ctx.thread_id, call_id = %call.id, "Human answered");
                let message = Message::tool(answer, &call.id).with_name(ASK_HUMAN_TOOL);
                let delta = StateDelta::append(message);
                if pending.len() > 1 {
                    debug!(thread_id = %ctx.thread_id, remaining = pending.len() - 1, "More questions pending");
                    return Ok(NodeOutcome::goto(delta, Goto::Node(ctx.node.clone())));
                }
                Ok(NodeOutcome::update(delta))
            }
        }
    }
}
