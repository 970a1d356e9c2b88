//! Request and response bodies of the HTTP API

use parley_core::messages::{Message, MessageRole, ToolCall};
use parley_core::Interrupt;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Basic user input for the agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInput {
    /// What the user typed; the resume value when the thread is waiting for an answer
    pub message: String,

    /// Model for this turn; the server's configured model when absent
    #[serde(default)]
    pub model: Option<String>,

    /// Thread to continue; a fresh one is created when absent
    #[serde(default)]
    pub thread_id: Option<String>,
}

/// User input for the streaming endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamInput {
    #[serde(flatten)]
    pub input: UserInput,

    /// Forward model tokens as they arrive
    #[serde(default = "default_stream_tokens")]
    pub stream_tokens: bool,
}

fn default_stream_tokens() -> bool {
    true
}

#[derive(Debug, Error)]
pub enum MessageConversionError {
    #[error("{0}")]
    Serialization(#[from] serde_json::Error),

    #[error("serialized message is not an object")]
    NotAnObject,

    #[error("cannot rebuild a '{0}' message without its original form")]
    Unsupported(MessageRole),
}

/// Client-facing form of a conversation message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "type")]
    pub kind: MessageRole,

    /// Display text; parts lists are flattened on input
    #[serde(deserialize_with = "flatten_content")]
    pub content: String,

    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,

    #[serde(default)]
    pub tool_call_id: Option<String>,

    #[serde(default)]
    pub run_id: Option<String>,

    /// The message as stored on the thread
    #[serde(default)]
    pub original: Map<String, Value>,
}

impl ChatMessage {
    pub fn from_message(message: &Message) -> Result<Self, MessageConversionError> {
        let original = match serde_json::to_value(message)? {
            Value::Object(map) => map,
            _ => return Err(MessageConversionError::NotAnObject),
        };

        Ok(Self {
            kind: message.role(),
            content: message.content().to_string(),
            tool_calls: message.tool_calls().to_vec(),
            tool_call_id: message.tool_call_id().map(str::to_string),
            run_id: None,
            original,
        })
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    /// Rebuild the stored message, carrying over the displayed content.
    ///
    /// Without `original` only human messages can be rebuilt.
    pub fn to_message(&self) -> Result<Message, MessageConversionError> {
        if !self.original.is_empty() {
            let mut message: Message = serde_json::from_value(Value::Object(self.original.clone()))?;
            message.set_content(self.content.clone());
            return Ok(message);
        }
        match self.kind {
            MessageRole::Human => Ok(Message::human(self.content.clone())),
            other => Err(MessageConversionError::Unsupported(other)),
        }
    }
}

/// Text of a content value: a string as-is, or the text parts of a list joined together
pub fn content_to_string(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) => parts
            .iter()
            .filter_map(|part| match part {
                Value::String(text) => Some(text.as_str()),
                Value::Object(fields) if fields.get("type").and_then(Value::as_str) == Some("text") => {
                    fields.get("text").and_then(Value::as_str)
                }
                _ => None,
            })
            .collect(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn flatten_content<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(|value| content_to_string(&value))
}

/// Result of a non-streaming turn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvokeResponse {
    pub thread_id: String,
    pub run_id: String,

    /// Last message the client would have seen on the stream
    pub message: Option<ChatMessage>,

    /// Present when the turn stopped to wait for the human
    pub interrupt: Option<Interrupt>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub graph: String,
}

impl HealthResponse {
    pub fn ok(graph: impl Into<String>) -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            graph: graph.into(),
        }
    }
}
