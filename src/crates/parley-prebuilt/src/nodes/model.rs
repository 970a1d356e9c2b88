//! ModelNode - one chat-model invocation per entry
//!
//! The node assembles a system instruction from the thread state, prefixes it to the
//! history, binds the registry's tools and appends exactly one AI message. Model errors abort
//! the turn.

use crate::prompts::analyst_prompt;
use async_trait::async_trait;
use futures::StreamExt;
use parley_core::llm::{ChatModel, ChatRequest, StreamChunk, ToolDefinition};
use parley_core::messages::Message;
use parley_core::node::{Node, NodeContext};
use parley_core::state::{ConversationState, StateDelta};
use parley_core::tool::{ask_human_definition, ToolRegistry};
use parley_core::{GraphError, NodeOutcome, Result};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// How the system instruction is built from the state
#[derive(Clone)]
pub enum SystemPrompt {
    /// Fixed text
    Static(String),
    /// Derived context followed by role text
    Context(String),
    /// Analyst role filled with the selection, derived context and guidance
    Analyst,
    Custom(Arc<dyn Fn(&ConversationState) -> String + Send + Sync>),
}

impl SystemPrompt {
    pub fn custom(f: impl Fn(&ConversationState) -> String + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    pub fn render(&self, state: &ConversationState) -> String {
        match self {
            Self::Static(text) => text.clone(),
            Self::Context(role) if state.derived_context.is_empty() => role.clone(),
            Self::Context(role) => format!("{}\n{}", state.derived_context, role),
            Self::Analyst => analyst_prompt(
                &state.selected_entities,
                &state.derived_context,
                &state.guidance,
            ),
            Self::Custom(f) => f(state),
        }
    }
}

impl fmt::Debug for SystemPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(text) => f.debug_tuple("Static").field(text).finish(),
            Self::Context(role) => f.debug_tuple("Context").field(role).finish(),
            Self::Analyst => f.write_str("Analyst"),
            Self::Custom(_) => f.write_str("Custom(<function>)"),
        }
    }
}

#[derive(Clone)]
pub struct ModelNode {
    model: Arc<dyn ChatModel>,
    prompt: SystemPrompt,
    tools: Arc<ToolRegistry>,
    ask_human: Option<ToolDefinition>,
}

impl ModelNode {
    pub fn new(model: Arc<dyn ChatModel>, prompt: SystemPrompt) -> Self {
        Self {
            model,
            prompt,
            tools: Arc::new(ToolRegistry::new()),
            ask_human: None,
        }
    }

    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    /// Bind the default `AskHuman` definition
    pub fn with_ask_human(self) -> Self {
        self.with_ask_human_definition(ask_human_definition())
    }

    pub fn with_ask_human_definition(mut self, definition: ToolDefinition) -> Self {
        self.ask_human = Some(definition);
        self
    }

    /// Request this node sends for `state`
    pub fn request(&self, state: &ConversationState, ctx: &NodeContext) -> ChatRequest {
        let mut tools = self.tools.definitions();
        tools.extend(self.ask_human.clone());

        let request = ChatRequest::new(state.messages.clone())
            .with_system(self.prompt.render(state))
            .with_tools(tools);

        match ctx.model_override() {
            Some(model) => request.with_model(model),
            None => request,
        }
    }

    async fn invoke(&self, request: ChatRequest, ctx: &NodeContext) -> Result<Message> {
        if !ctx.streams_tokens() {
            return Ok(self.model.chat(request).await?.message);
        }

        let mut stream = self.model.stream(request).await?;
        while let Some(chunk) = stream.next().await {
            match chunk? {
                StreamChunk::Token(token) => ctx.emit_token(&token),
                StreamChunk::Done(response) => return Ok(response.message),
            }
        }
        Err(GraphError::model("stream ended without a final response"))
    }
}

impl fmt::Debug for ModelNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelNode")
            .field("model", &self.model.model_name())
            .field("prompt", &self.prompt)
            .field("tools", &self.tools.tool_names())
            .field("ask_human", &self.ask_human.is_some())
            .finish()
    }
}

#[async_trait]
impl Node<ConversationState> for ModelNode {
    async fn run(&self, state: &ConversationState, ctx: &NodeContext) -> Result<NodeOutcome<StateDelta>> {
        let request = self.request(state, ctx);
        let message = self.invoke(request, ctx).await?;

        if !message.is_ai() {
            return Err(GraphError::model(format!(
                "model returned a {} message",
                message.role()
            )));
        }
        debug!(
            node = %ctx.node,
            tool_calls = message.tool_calls().len(),
            "Model responded"
        );

        Ok(NodeOutcome::update(StateDelta::append(message)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::config::RunConfig;
    use parley_core::llm::ScriptedChatModel;
    use parley_core::messages::ToolCall;
    use parley_core::tool::Tool;
    use serde_json::json;

    fn state() -> ConversationState {
        ConversationState {
            messages: vec![Message::human("dame el SLA")],
            selected_entities: vec!["A".to_string()],
            derived_context: "Datos disponibles para las oficinas: \n A: enero".to_string(),
            context_entities: vec!["A".to_string()],
            guidance: "Entrega el SLA de enero".to_string(),
        }
    }

    #[test]
    fn test_system_prompt_rendering() {
        let state = state();
        assert_eq!(SystemPrompt::Static("rol".into()).render(&state), "rol");
        assert!(SystemPrompt::Context("rol".into())
            .render(&state)
            .starts_with("Datos disponibles"));
        assert_eq!(
            SystemPrompt::Context("rol".into()).render(&ConversationState::default()),
            "rol"
        );

        let analyst = SystemPrompt::Analyst.render(&state);
        assert!(analyst.contains("[\"A\"]"));
        assert!(analyst.contains("Entrega el SLA de enero"));
    }

    #[tokio::test]
    async fn test_appends_one_ai_message() {
        let model = Arc::new(ScriptedChatModel::default().then_call(vec![ToolCall::new(
            "c1",
            "sla",
            json!({}),
        )]));
        let tools = Arc::new(ToolRegistry::new().with_tool(Tool::new(
            "sla",
            "SLA",
            json!({"type": "object"}),
            |_| Ok("97%".to_string()),
        )));
        let node = ModelNode::new(model.clone(), SystemPrompt::Analyst)
            .with_tools(tools)
            .with_ask_human();

        let ctx = NodeContext::new("agent", RunConfig::new("t1").with_model("gpt-4o-mini"));
        let outcome = node.run(&state(), &ctx).await.unwrap();
        let NodeOutcome::Continue(command) = outcome else {
            panic!("Expected continue");
        };
        let appended: Vec<_> = command.update.appended().collect();
        assert_eq!(appended.len(), 1);
        assert_eq!(appended[0].tool_calls()[0].id, "c1");

        let requests = model.requests().await;
        let tool_names: Vec<_> = requests[0].tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(tool_names, vec!["sla", "AskHuman"]);
        assert_eq!(requests[0].config.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(requests[0].messages.len(), 1);
    }

    #[tokio::test]
    async fn test_model_error_aborts() {
        let model = Arc::new(ScriptedChatModel::default().then_fail("rate limited"));
        let node = ModelNode::new(model, SystemPrompt::Static("rol".into()));
        let ctx = NodeContext::new("agent", RunConfig::new("t1"));

        let err = node.run(&state(), &ctx).await.unwrap_err();
        assert!(matches!(err, GraphError::Model(_)));
    }

    #[tokio::test]
    async fn test_non_ai_reply_is_rejected() {
        let model = Arc::new(ScriptedChatModel::new([Message::human("eco")]));
        let node = ModelNode::new(model, SystemPrompt::Static("rol".into()));
        let ctx = NodeContext::new("agent", RunConfig::new("t1"));

        assert!(matches!(
            node.run(&state(), &ctx).await,
            Err(GraphError::Model(_))
        ));
    }
}
