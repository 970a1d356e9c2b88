//! Routing on the model's tool-call intent
//!
//! After a model node runs, the last message decides where the turn goes:
//!
//! | Last message | Route |
//! |--------------|-------|
//! | none, or no tool calls | END |
//! | only `AskHuman` calls | human-input node |
//! | only regular calls | tool-execution node |
//! | `AskHuman` and regular calls | both, in the same step |
//!
//! In the mixed case the tool node answers every regular call and skips `AskHuman`; the
//! human-input node answers only `AskHuman`. Each call gets exactly one result.

use parley_core::state::ConversationState;
use parley_core::tool::ASK_HUMAN_TOOL;
use parley_core::{Route, END};

/// Default name of the tool-execution node
pub const TOOLS_NODE: &str = "tools";

/// Default name of the human-input node
pub const ASK_HUMAN_NODE: &str = "ask_human";

/// Route with the default node names
pub fn route_tools(state: &ConversationState) -> Route {
    ToolRouter::default().route(state)
}

/// Tool-call router with configurable target names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolRouter {
    pub tools_node: String,
    /// `None` sends `AskHuman` calls to the tool node like any other call
    pub ask_human_node: Option<String>,
}

impl Default for ToolRouter {
    fn default() -> Self {
        Self::new(TOOLS_NODE, Some(ASK_HUMAN_NODE))
    }
}

impl ToolRouter {
    pub fn new(tools_node: impl Into<String>, ask_human_node: Option<&str>) -> Self {
        Self {
            tools_node: tools_node.into(),
            ask_human_node: ask_human_node.map(String::from),
        }
    }

    pub fn route(&self, state: &ConversationState) -> Route {
        let Some(last) = state.last_message() else {
            return Route::End;
        };
        let calls = last.tool_calls();
        if calls.is_empty() {
            return Route::End;
        }

        let Some(ask_node) = &self.ask_human_node else {
            return Route::to(self.tools_node.clone());
        };

        let asks = calls.iter().any(|c| c.name == ASK_HUMAN_TOOL);
        let others = calls.iter().any(|c| c.name != ASK_HUMAN_TOOL);
        match (asks, others) {
            (true, false) => Route::to(ask_node.clone()),
            (true, true) => Route::fanout([self.tools_node.clone(), ask_node.clone()]),
            _ => Route::to(self.tools_node.clone()),
        }
    }

    /// Every node this router may return, for `add_conditional_edges`
    pub fn targets(&self) -> Vec<String> {
        let mut targets = vec![self.tools_node.clone()];
        targets.extend(self.ask_human_node.clone());
        targets.push(END.to_string());
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::messages::{Message, ToolCall};
    use serde_json::json;

    fn state_with(message: Message) -> ConversationState {
        ConversationState {
            messages: vec![Message::human("hola"), message],
            ..Default::default()
        }
    }

    fn call(name: &str) -> ToolCall {
        ToolCall::new(format!("call_{}", name), name, json!({}))
    }

    #[test]
    fn test_empty_log_ends() {
        assert_eq!(route_tools(&ConversationState::default()), Route::End);
    }

    #[test]
    fn test_plain_reply_ends() {
        assert_eq!(route_tools(&state_with(Message::ai("listo"))), Route::End);
        assert_eq!(route_tools(&state_with(Message::ai(""))), Route::End);
    }

    #[test]
    fn test_ask_human_only() {
        let state = state_with(Message::ai_with_tool_calls("", vec![call(ASK_HUMAN_TOOL)]));
        assert_eq!(route_tools(&state), Route::to(ASK_HUMAN_NODE));
    }

    #[test]
    fn test_regular_calls() {
        let state = state_with(Message::ai_with_tool_calls("", vec![call("search"), call("sla")]));
        assert_eq!(route_tools(&state), Route::to(TOOLS_NODE));
    }

    #[test]
    fn test_mixed_calls_fan_out() {
        let state = state_with(Message::ai_with_tool_calls(
            "",
            vec![call("search"), call(ASK_HUMAN_TOOL)],
        ));
        assert_eq!(
            route_tools(&state),
            Route::Fanout(vec![TOOLS_NODE.to_string(), ASK_HUMAN_NODE.to_string()])
        );
    }

    #[test]
    fn test_router_without_human_node() {
        let router = ToolRouter::new("analyst_tools", None);
        let state = state_with(Message::ai_with_tool_calls("", vec![call(ASK_HUMAN_TOOL)]));
        assert_eq!(router.route(&state), Route::to("analyst_tools"));
        assert_eq!(router.targets(), vec!["analyst_tools", END]);
    }
}
