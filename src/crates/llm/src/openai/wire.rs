//! Chat-completions wire format and conversion to and from parley messages

use crate::error::{LlmError, Result};
use parley_core::llm::{ChatRequest, ChatResponse, ToolDefinition, UsageMetadata};
use parley_core::messages::{Message, ToolCall};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub(crate) struct CompletionRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<WireTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<StreamOptions>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StreamOptions {
    pub include_usage: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct WireMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct WireToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: WireFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct WireFunction {
    pub name: String,
    /// JSON-encoded argument object
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireTool {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: WireFunctionDef,
}

#[derive(Debug, Serialize)]
pub(crate) struct WireFunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: WireMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct WireUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

impl From<WireUsage> for UsageMetadata {
    fn from(usage: WireUsage) -> Self {
        UsageMetadata::new(usage.prompt_tokens, usage.completion_tokens)
    }
}

fn function_kind() -> String {
    "function".to_string()
}

pub(crate) fn to_wire_message(message: &Message) -> WireMessage {
    match message {
        Message::Human(m) => WireMessage {
            role: "user".to_string(),
            content: Some(m.content.clone()),
            tool_calls: None,
            tool_call_id: None,
        },
        Message::Ai(m) => {
            let tool_calls = (!m.tool_calls.is_empty())
                .then(|| m.tool_calls.iter().map(to_wire_call).collect());
            // an assistant turn that only calls tools carries a null content
            let content = if m.content.is_empty() && tool_calls.is_some() {
                None
            } else {
                Some(m.content.clone())
            };
            WireMessage {
                role: "assistant".to_string(),
                content,
                tool_calls,
                tool_call_id: None,
            }
        }
        Message::Tool(m) => WireMessage {
            role: "tool".to_string(),
            content: Some(m.content.clone()),
            tool_calls: None,
            tool_call_id: Some(m.tool_call_id.clone()),
        },
    }
}

fn to_wire_call(call: &ToolCall) -> WireToolCall {
    let arguments = match &call.args {
        Value::Null => "{}".to_string(),
        other => other.to_string(),
    };
    WireToolCall {
        id: call.id.clone(),
        kind: function_kind(),
        function: WireFunction {
            name: call.name.clone(),
            arguments,
        },
    }
}

fn to_wire_tool(tool: &ToolDefinition) -> WireTool {
    WireTool {
        kind: "function",
        function: WireFunctionDef {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        },
    }
}

/// Decode a streamed or complete `arguments` string.
///
/// Models occasionally emit malformed JSON; the raw text is kept as a string so the tool
/// node reports the problem back to the model instead of aborting the turn.
pub(crate) fn parse_arguments(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(trimmed).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "model emitted tool arguments that are not JSON");
        Value::String(raw.to_string())
    })
}

pub(crate) fn build_request(request: &ChatRequest, default_model: &str, stream: bool) -> CompletionRequest {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = request.system.as_deref().filter(|s| !s.is_empty()) {
        messages.push(WireMessage {
            role: "system".to_string(),
            content: Some(system.to_string()),
            tool_calls: None,
            tool_call_id: None,
        });
    }
    messages.extend(request.messages.iter().map(to_wire_message));

    CompletionRequest {
        model: request
            .config
            .model
            .clone()
            .unwrap_or_else(|| default_model.to_string()),
        messages,
        tools: request.tools.iter().map(to_wire_tool).collect(),
        temperature: request.config.temperature,
        max_tokens: request.config.max_tokens,
        stream,
        stream_options: None,
    }
}

pub(crate) fn assemble_response(
    content: String,
    calls: Vec<ToolCall>,
    model: Option<String>,
    finish_reason: Option<String>,
    usage: Option<WireUsage>,
) -> ChatResponse {
    let mut response = ChatResponse::new(Message::ai_with_tool_calls(content, calls));
    if let Some(model) = model {
        response = response.with_metadata("model", Value::String(model));
    }
    if let Some(reason) = finish_reason {
        response = response.with_metadata("finish_reason", Value::String(reason));
    }
    if let Some(usage) = usage {
        response = response.with_usage(usage.into());
    }
    response
}

pub(crate) fn from_completion(response: CompletionResponse) -> Result<ChatResponse> {
    let CompletionResponse {
        id,
        model,
        choices,
        usage,
    } = response;
    let choice = choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("response has no choices".to_string()))?;

    let calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolCall::new(call.id, call.function.name, parse_arguments(&call.function.arguments)))
        .collect();

    let mut chat = assemble_response(
        choice.message.content.unwrap_or_default(),
        calls,
        model,
        choice.finish_reason,
        usage,
    );
    if let Some(id) = id {
        chat = chat.with_metadata("response_id", Value::String(id));
    }
    Ok(chat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let request = ChatRequest::new(vec![
            Message::human("dame el SLA"),
            Message::ai_with_tool_calls("", vec![ToolCall::new("c1", "sla", json!({"periodo": "enero"}))]),
            Message::tool("97%", "c1").with_name("sla"),
        ])
        .with_system("Eres un analista.")
        .with_tools(vec![ToolDefinition::new("sla", "SLA por periodo", json!({"type": "object"}))])
        .with_temperature(0.0);

        let body = serde_json::to_value(build_request(&request, "gpt-4o", false)).unwrap();

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["stream"], false);
        assert!(body.get("max_tokens").is_none());

        let roles: Vec<_> = body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "tool"]);

        let assistant = &body["messages"][2];
        assert!(assistant["content"].is_null());
        assert_eq!(assistant["tool_calls"][0]["type"], "function");
        assert_eq!(assistant["tool_calls"][0]["function"]["arguments"], "{\"periodo\":\"enero\"}");
        assert_eq!(body["messages"][3]["tool_call_id"], "c1");

        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "sla");
    }

    #[test]
    fn test_request_model_override() {
        let request = ChatRequest::new(vec![Message::human("hola")]).with_model("gpt-4o-mini");
        let body = build_request(&request, "gpt-4o", true);
        assert_eq!(body.model, "gpt-4o-mini");
        assert!(body.tools.is_empty());
        assert_eq!(body.messages.len(), 1);
    }

    #[test]
    fn test_response_with_tool_calls() {
        let response: CompletionResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "model": "gpt-4o-2024-08-06",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "AskHuman", "arguments": "{\"question_for_human\":\"¿Periodo?\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 12, "completion_tokens": 8, "total_tokens": 20}
        }))
        .unwrap();

        let chat = from_completion(response).unwrap();
        let calls = chat.message.tool_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].arg_str("question_for_human"), Some("¿Periodo?"));
        assert_eq!(chat.message.content(), "");
        assert_eq!(chat.usage.unwrap().total_tokens, 20);
        assert_eq!(chat.metadata["finish_reason"], "tool_calls");
        assert_eq!(chat.metadata["response_id"], "chatcmpl-1");
    }

    #[test]
    fn test_response_without_choices() {
        let response: CompletionResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert!(matches!(from_completion(response), Err(LlmError::InvalidResponse(_))));
    }

    #[test]
    fn test_parse_arguments() {
        assert_eq!(parse_arguments(""), json!({}));
        assert_eq!(parse_arguments(" {\"a\": 1} "), json!({"a": 1}));
        assert_eq!(parse_arguments("{\"a\": "), json!("{\"a\": "));
    }
}
