//! Server-sent event decoding for streamed completions

use super::wire::{assemble_response, parse_arguments, WireUsage};
use crate::error::{LlmError, Result};
use parley_core::llm::ChatResponse;
use parley_core::messages::ToolCall;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Splits a byte stream into complete lines; partial lines wait for the next chunk
#[derive(Debug, Default)]
pub(crate) struct SseLines {
    pending: Vec<u8>,
}

impl SseLines {
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line);
            let text = text.trim_end_matches(['\n', '\r']);
            if !text.is_empty() {
                lines.push(text.to_string());
            }
        }
        lines
    }
}

#[derive(Debug, PartialEq)]
pub(crate) enum SseEvent {
    Token(String),
    Skip,
    Done,
}

#[derive(Debug, Deserialize)]
struct ChunkBody {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<DeltaChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct DeltaChoice {
    #[serde(default)]
    delta: Delta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<DeltaToolCall>,
}

#[derive(Debug, Deserialize)]
struct DeltaToolCall {
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<DeltaFunction>,
}

#[derive(Debug, Deserialize)]
struct DeltaFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Default)]
struct PartialCall {
    id: String,
    name: String,
    arguments: String,
}

/// Rebuilds the full response from streamed deltas.
///
/// Tool calls arrive in fragments keyed by `index`: the first fragment carries the id and
/// name, later ones append to the argument string.
#[derive(Debug, Default)]
pub(crate) struct StreamAccumulator {
    content: String,
    calls: BTreeMap<usize, PartialCall>,
    model: Option<String>,
    finish_reason: Option<String>,
    usage: Option<WireUsage>,
}

impl StreamAccumulator {
    pub fn push_line(&mut self, line: &str) -> Result<SseEvent> {
        let Some(data) = line.strip_prefix("data:") else {
            // comments, `event:` and `id:` fields
            return Ok(SseEvent::Skip);
        };
        let data = data.trim();
        if data == "[DONE]" {
            return Ok(SseEvent::Done);
        }

        let chunk: ChunkBody = serde_json::from_str(data)
            .map_err(|e| LlmError::InvalidResponse(format!("bad stream chunk: {}", e)))?;
        if chunk.model.is_some() {
            self.model = chunk.model;
        }
        if chunk.usage.is_some() {
            self.usage = chunk.usage;
        }

        let mut token = String::new();
        for choice in chunk.choices {
            if let Some(reason) = choice.finish_reason {
                self.finish_reason = Some(reason);
            }
            if let Some(content) = choice.delta.content {
                token.push_str(&content);
            }
            for call in choice.delta.tool_calls {
                let partial = self.calls.entry(call.index).or_default();
                if let Some(id) = call.id {
                    partial.id = id;
                }
                if let Some(function) = call.function {
                    if let Some(name) = function.name {
                        partial.name.push_str(&name);
                    }
                    if let Some(arguments) = function.arguments {
                        partial.arguments.push_str(&arguments);
                    }
                }
            }
        }

        if token.is_empty() {
            Ok(SseEvent::Skip)
        } else {
            self.content.push_str(&token);
            Ok(SseEvent::Token(token))
        }
    }

    pub fn finish(self) -> Result<ChatResponse> {
        let mut calls = Vec::with_capacity(self.calls.len());
        for (index, partial) in self.calls {
            if partial.name.is_empty() {
                return Err(LlmError::InvalidResponse(format!(
                    "streamed tool call {} has no name",
                    index
                )));
            }
            calls.push(ToolCall::new(partial.id, partial.name, parse_arguments(&partial.arguments)));
        }
        Ok(assemble_response(
            self.content,
            calls,
            self.model,
            self.finish_reason,
            self.usage,
        ))
    }
}
