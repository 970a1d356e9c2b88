//! Conversation messages and the commands that edit a message log
//!
//! A [`Message`] is a closed enum over the three roles a conversation log holds:
//!
//! - [`HumanMessage`] - what the user typed, or what the client sent
//! - [`AiMessage`] - a model response, optionally requesting [`ToolCall`]s
//! - [`ToolMessage`] - the result of one tool call, linked back by `tool_call_id`
//!
//! System instructions are not part of the log; model nodes assemble them per request.
//!
//! Every message has an `id` and an open `extra` map. Fields a provider or client attaches
//! that this crate does not model survive a serialize/deserialize round trip through it.
//!
//! # Editing the log
//!
//! Nodes never mutate the log directly. They return [`MessageOp`]s, which the engine applies
//! in order with [`apply_ops`]:
//!
//! ```rust
//! use parley_core::messages::{apply_ops, Message, MessageOp};
//!
//! let mut log = vec![Message::human("hola").with_id("m1")];
//! apply_ops(&mut log, vec![
//!     MessageOp::RemoveById("m1".to_string()),
//!     MessageOp::Append(Message::human("dame el SLA").with_id("m1")),
//!     MessageOp::Append(Message::ai("¿Para qué periodo?")),
//! ]);
//!
//! assert_eq!(log.len(), 2);
//! assert_eq!(log[0].content(), "dame el SLA");
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// A model-declared request to invoke a named tool
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
        }
    }

    /// String argument `key`, if present
    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(Value::as_str)
    }
}

/// Speaker of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    Human,
    Ai,
    Tool,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Ai => "ai",
            Self::Tool => "tool",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HumanMessage {
    #[serde(default = "new_id")]
    pub id: String,
    pub content: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiMessage {
    #[serde(default = "new_id")]
    pub id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Outcome recorded on a tool-result message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    #[default]
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolMessage {
    #[serde(default = "new_id")]
    pub id: String,
    pub content: String,
    pub tool_call_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub status: ToolStatus,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One entry of a conversation log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Human(HumanMessage),
    Ai(AiMessage),
    Tool(ToolMessage),
}

impl Message {
    pub fn human(content: impl Into<String>) -> Self {
        Self::Human(HumanMessage {
            id: new_id(),
            content: content.into(),
            extra: Map::new(),
        })
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self::ai_with_tool_calls(content, Vec::new())
    }

    pub fn ai_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::Ai(AiMessage {
            id: new_id(),
            content: content.into(),
            tool_calls,
            extra: Map::new(),
        })
    }

    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self::Tool(ToolMessage {
            id: new_id(),
            content: content.into(),
            tool_call_id: tool_call_id.into(),
            name: None,
            status: ToolStatus::Success,
            extra: Map::new(),
        })
    }

    /// Tool-result message describing a failed call
    pub fn tool_error(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        let mut message = Self::tool(content, tool_call_id);
        if let Self::Tool(tool) = &mut message {
            tool.status = ToolStatus::Error;
        }
        message
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        match &mut self {
            Self::Human(m) => m.id = id,
            Self::Ai(m) => m.id = id,
            Self::Tool(m) => m.id = id,
        }
        self
    }

    /// Set the tool name on a tool-result message; no-op for other roles
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        if let Self::Tool(m) = &mut self {
            m.name = Some(name.into());
        }
        self
    }

    pub fn role(&self) -> MessageRole {
        match self {
            Self::Human(_) => MessageRole::Human,
            Self::Ai(_) => MessageRole::Ai,
            Self::Tool(_) => MessageRole::Tool,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Human(m) => &m.id,
            Self::Ai(m) => &m.id,
            Self::Tool(m) => &m.id,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Self::Human(m) => &m.content,
            Self::Ai(m) => &m.content,
            Self::Tool(m) => &m.content,
        }
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        let content = content.into();
        match self {
            Self::Human(m) => m.content = content,
            Self::Ai(m) => m.content = content,
            Self::Tool(m) => m.content = content,
        }
    }

    pub fn extra(&self) -> &Map<String, Value> {
        match self {
            Self::Human(m) => &m.extra,
            Self::Ai(m) => &m.extra,
            Self::Tool(m) => &m.extra,
        }
    }

    /// Tool calls requested by an AI message (empty for other roles)
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::Ai(m) => &m.tool_calls,
            _ => &[],
        }
    }

    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            Self::Tool(m) => Some(&m.tool_call_id),
            _ => None,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls().is_empty()
    }

    pub fn is_human(&self) -> bool {
        matches!(self, Self::Human(_))
    }

    pub fn is_ai(&self) -> bool {
        matches!(self, Self::Ai(_))
    }

    pub fn is_tool(&self) -> bool {
        matches!(self, Self::Tool(_))
    }
}

/// A single edit to a message log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum MessageOp {
    /// Add a message at the end of the log
    Append(Message),
    /// Remove every message carrying this id
    RemoveById(String),
}

/// Apply `ops` to `messages` in order
pub fn apply_ops(messages: &mut Vec<Message>, ops: impl IntoIterator<Item = MessageOp>) {
    for op in ops {
        match op {
            MessageOp::Append(message) => messages.push(message),
            MessageOp::RemoveById(id) => messages.retain(|m| m.id() != id),
        }
    }
}

/// Most recent human message in `messages`
pub fn last_human(messages: &[Message]) -> Option<&Message> {
    messages.iter().rev().find(|m| m.is_human())
}
