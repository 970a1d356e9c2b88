//! Scripted chat model for deterministic tests

use super::config::ChatRequest;
use super::response::ChatResponse;
use super::traits::ChatModel;
use crate::error::{GraphError, Result};
use crate::messages::{Message, ToolCall};
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// Replays a fixed list of responses, one per call, and records every request
#[derive(Debug, Default)]
pub struct ScriptedChatModel {
    script: Mutex<VecDeque<Result<Message>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChatModel {
    pub fn new(responses: impl IntoIterator<Item = Message>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Append a plain text reply
    pub fn then_reply(self, content: impl Into<String>) -> Self {
        self.then(Message::ai(content))
    }

    /// Append a reply requesting tool calls
    pub fn then_call(self, calls: Vec<ToolCall>) -> Self {
        self.then(Message::ai_with_tool_calls("", calls))
    }

    /// Append a failing invocation
    pub fn then_fail(mut self, error: impl Into<String>) -> Self {
        self.script.get_mut().push_back(Err(GraphError::Model(error.into())));
        self
    }

    pub fn then(mut self, message: Message) -> Self {
        self.script.get_mut().push_back(Ok(message));
        self
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    pub async fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn remaining(&self) -> usize {
        self.script.lock().await.len()
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        self.requests.lock().await.push(request);
        match self.script.lock().await.pop_front() {
            Some(Ok(message)) => Ok(ChatResponse::new(message)),
            Some(Err(err)) => Err(err),
            None => Err(GraphError::Model("scripted model has no responses left".to_string())),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
