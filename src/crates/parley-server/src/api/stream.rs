//! Server-sent event adapter for running turns
//!
//! A turn's [`GraphEvent`]s are filtered down to what the chat client should see and
//! rendered as `data:` lines:
//!
//! ```text
//! data: {"type":"token","content":"¿Para"}
//! data: {"type":"message","content":{"type":"ai","content":"¿Para qué mes?",...}}
//! data: [DONE]
//! ```
//!
//! Only messages produced by the streamed nodes are shown. Human messages are never echoed
//! back. An AI message that calls tools is displayed as the question it asks (or its
//! arguments as text), and calls to hidden internal tools are dropped along with their
//! results.

use super::models::{ChatMessage, StreamInput};
use super::AppState;
use crate::error::ApiResult;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures::stream::{self, StreamExt};
use parley_core::messages::{Message, MessageOp};
use parley_core::tool::ask_human_question;
use parley_core::{ConversationState, GraphError, GraphEvent, StateDelta};
use serde::Serialize;
use std::collections::HashSet;
use std::convert::Infallible;

/// Terminator line sent after the last event of a turn
pub const DONE: &str = "[DONE]";

/// Response header carrying the thread the turn ran on
pub const THREAD_ID_HEADER: &str = "x-thread-id";

/// One `data:` payload on the stream
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum StreamEvent {
    Token(String),
    Message(ChatMessage),
    Error(String),
}

/// Decides which nodes and messages reach the client
#[derive(Debug, Clone, Default)]
pub struct StreamFilter {
    nodes: HashSet<String>,
    hidden_tools: HashSet<String>,
}

impl StreamFilter {
    pub fn new(
        nodes: impl IntoIterator<Item = impl Into<String>>,
        hidden_tools: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            nodes: nodes.into_iter().map(Into::into).collect(),
            hidden_tools: hidden_tools.into_iter().map(Into::into).collect(),
        }
    }

    pub fn streams_node(&self, node: &str) -> bool {
        self.nodes.contains(node)
    }

    fn is_hidden(&self, message: &Message) -> bool {
        match message {
            Message::Human(_) => true,
            Message::Ai(ai) => ai
                .tool_calls
                .iter()
                .any(|call| self.hidden_tools.contains(&call.name)),
            Message::Tool(tool) => tool
                .name
                .as_ref()
                .is_some_and(|name| self.hidden_tools.contains(name)),
        }
    }

    /// Client-facing form of `message`, `None` when it is not shown
    pub fn present(&self, message: &Message, run_id: &str) -> Option<StreamEvent> {
        if self.is_hidden(message) {
            return None;
        }

        let event = match ChatMessage::from_message(message) {
            Ok(mut chat) => {
                if let Some(call) = chat.tool_calls.first() {
                    chat.content = ask_human_question(call)
                        .map(str::to_string)
                        .unwrap_or_else(|| call.args.to_string());
                }
                StreamEvent::Message(chat.with_run_id(run_id))
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to convert message for the client");
                StreamEvent::Error(format!("Error parsing message: {}", err))
            }
        };
        Some(event)
    }

    /// Visible events for one graph event
    pub fn render(
        &self,
        event: &GraphEvent<ConversationState, StateDelta>,
        run_id: &str,
    ) -> Vec<StreamEvent> {
        match event {
            GraphEvent::Token { node, content } if self.streams_node(node) => {
                vec![StreamEvent::Token(content.clone())]
            }
            GraphEvent::Update { node, update, .. } if self.streams_node(node) => update
                .messages
                .iter()
                .filter_map(|op| match op {
                    MessageOp::Append(message) => self.present(message, run_id),
                    MessageOp::RemoveById(_) => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl StreamEvent {
    fn from_graph_error(err: &GraphError) -> Self {
        Self::Error(err.to_string())
    }

    /// SSE frame for this payload; a payload that cannot be encoded becomes an error frame
    pub fn to_sse(&self) -> Event {
        match Event::default().json_data(self) {
            Ok(event) => event,
            Err(err) => {
                tracing::error!(error = %err, "Failed to encode stream event");
                let fallback = StreamEvent::Error(format!("Error encoding event: {}", err));
                Event::default().data(
                    serde_json::to_string(&fallback)
                        .unwrap_or_else(|_| r#"{"type":"error","content":"encoding failed"}"#.to_string()),
                )
            }
        }
    }
}

/// Handler for POST /stream
///
/// Starts a new turn, or resumes the thread when it is waiting for the human, and streams
/// the visible output. The thread id is returned in the `x-thread-id` header. The turn keeps
/// running if the client disconnects.
pub async fn stream_turn(
    State(app): State<AppState>,
    Json(request): Json<StreamInput>,
) -> ApiResult<impl IntoResponse> {
    let turn = app.prepare_turn(&request.input, request.stream_tokens).await?;
    tracing::info!(
        thread_id = %turn.config.thread_id,
        run_id = %turn.config.run_id,
        resume = turn.is_resume(),
        "Streaming turn"
    );

    let thread_id = turn.config.thread_id.clone();
    let run_id = turn.config.run_id.clone();
    let filter = app.filter.clone();
    let events = app.graph.stream(turn.input, turn.config);

    let body = events
        .flat_map(move |item| {
            let frames = match item {
                Ok(event) => filter.render(&event, &run_id),
                Err(err) => {
                    tracing::error!(error = %err, run_id = %run_id, "Turn failed");
                    vec![StreamEvent::from_graph_error(&err)]
                }
            };
            stream::iter(frames)
        })
        .map(|frame| frame.to_sse())
        .chain(stream::once(async { Event::default().data(DONE) }))
        .map(Ok::<_, Infallible>);

    Ok((
        [(THREAD_ID_HEADER, thread_id)],
        Sse::new(body).keep_alive(KeepAlive::default()),
    ))
}
