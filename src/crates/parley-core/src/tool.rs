//! Tool registry and dispatch
//!
//! Tools are synchronous functions from a JSON argument object to text. The model requests
//! them through [`ToolCall`]s; the registry looks each one up, validates its arguments
//! against the declared schema and runs it on the blocking thread pool.
//!
//! ```text
//! AiMessage.tool_calls ──► ToolRegistry::execute_tool_call ──► ToolCallResult ──► ToolMessage
//!                             │  unknown name   → error content
//!                             │  bad arguments  → error content
//!                             │  Err / panic    → error content
//!                             └─ Ok(text)       → success content
//! ```
//!
//! Dispatch never fails: every outcome becomes a tool-result message so the conversation
//! can continue and the model can react to the failure.
//!
//! # Defining tools
//!
//! ```rust
//! use parley_core::tool::{Tool, ToolRegistry};
//! use serde::Deserialize;
//! use serde_json::json;
//!
//! #[derive(Deserialize)]
//! struct SlaArgs {
//!     office: String,
//! }
//!
//! let sla = Tool::typed(
//!     "office_sla",
//!     "Service level of one office",
//!     json!({
//!         "type": "object",
//!         "properties": {"office": {"type": "string"}},
//!         "required": ["office"]
//!     }),
//!     |args: SlaArgs| Ok(format!("{}: 97%", args.office)),
//! );
//!
//! let registry = ToolRegistry::new().with_tool(sla);
//! assert!(registry.has_tool("office_sla"));
//! ```

use crate::llm::ToolDefinition;
use crate::messages::{Message, ToolCall};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Name of the pseudo-tool the model calls to ask the human a question
pub const ASK_HUMAN_TOOL: &str = "AskHuman";

/// Errors from looking up, validating or running a tool
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum ToolError {
    #[error("Tool '{0}' not found. Available tools: {1}")]
    ToolNotFound(String, String),

    #[error("Tool '{tool}' execution failed: {error}")]
    ExecutionFailed { tool: String, error: String },

    #[error("Validation error for tool '{tool}': {error}")]
    ValidationError { tool: String, error: String },
}

/// Synchronous tool body
pub type ToolHandler = Arc<dyn Fn(Value) -> Result<String, String> + Send + Sync>;

/// A callable tool with its declared input schema
#[derive(Clone)]
pub struct Tool {
    pub name: String,
    pub description: String,
    /// JSON Schema of the argument object
    pub input_schema: Value,
    handler: ToolHandler,
}

impl Tool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: impl Fn(Value) -> Result<String, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler: Arc::new(handler),
        }
    }

    /// Tool whose arguments deserialize into `A`
    pub fn typed<A, F>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: F,
    ) -> Self
    where
        A: DeserializeOwned,
        F: Fn(A) -> Result<String, String> + Send + Sync + 'static,
    {
        Self::new(name, description, input_schema, move |args| {
            let args: A = serde_json::from_value(args).map_err(|e| format!("invalid arguments: {}", e))?;
            handler(args)
        })
    }

    /// Definition handed to the model
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(&self.name, &self.description, self.input_schema.clone())
    }

    /// Validate tool arguments against the declared schema.
    ///
    /// Arguments must be a JSON object. Full JSON Schema validation requires the
    /// `json-validation` feature.
    pub fn validate_args(&self, args: &Value) -> Result<(), ToolError> {
        if !args.is_object() {
            return Err(ToolError::ValidationError {
                tool: self.name.clone(),
                error: "Arguments must be an object".to_string(),
            });
        }

        #[cfg(feature = "json-validation")]
        {
            use jsonschema::JSONSchema;

            let compiled = JSONSchema::compile(&self.input_schema).map_err(|e| {
                ToolError::ValidationError {
                    tool: self.name.clone(),
                    error: format!("Invalid JSON Schema: {}", e),
                }
            })?;

            let messages = match compiled.validate(args) {
                Ok(()) => None,
                Err(errors) => Some(
                    errors
                        .map(|e| format!("{}: {}", e.instance_path, e))
                        .collect::<Vec<String>>(),
                ),
            };

            if let Some(messages) = messages {
                return Err(ToolError::ValidationError {
                    tool: self.name.clone(),
                    error: messages.join("; "),
                });
            }
        }

        Ok(())
    }

    /// Run the tool on the blocking pool; panics come back as `ExecutionFailed`
    pub async fn call(&self, args: Value) -> Result<String, ToolError> {
        let handler = self.handler.clone();
        let name = self.name.clone();

        match tokio::task::spawn_blocking(move || handler(args)).await {
            Ok(Ok(content)) => Ok(content),
            Ok(Err(error)) => Err(ToolError::ExecutionFailed { tool: name, error }),
            Err(join_error) => Err(ToolError::ExecutionFailed {
                tool: name,
                error: panic_message(join_error),
            }),
        }
    }
}

fn panic_message(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return "task cancelled".to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .field("handler", &"<function>")
            .finish()
    }
}

/// Outcome of one dispatched call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolOutput {
    Success { content: String },
    Error { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// Id of the call this answers
    pub id: String,
    pub name: String,
    pub output: ToolOutput,
}

impl ToolCallResult {
    pub fn is_error(&self) -> bool {
        matches!(self.output, ToolOutput::Error { .. })
    }

    /// Tool-result message answering the call
    pub fn into_message(self) -> Message {
        let message = match self.output {
            ToolOutput::Success { content } => Message::tool(content, self.id),
            ToolOutput::Error { error } => Message::tool_error(error, self.id),
        };
        message.with_name(self.name)
    }
}

/// Named collection of tools
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Tool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    pub fn with_tool(mut self, tool: Tool) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Tool names in sorted order
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions of every registered tool, sorted by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(Tool::definition).collect()
    }

    /// Dispatch one call. Never fails: errors become `ToolOutput::Error`.
    pub async fn execute_tool_call(&self, call: &ToolCall) -> ToolCallResult {
        let output = match self.try_execute(call).await {
            Ok(content) => ToolOutput::Success { content },
            Err(err) => {
                tracing::warn!(tool = %call.name, call_id = %call.id, error = %err, "Tool call failed");
                ToolOutput::Error {
                    error: err.to_string(),
                }
            }
        };

        ToolCallResult {
            id: call.id.clone(),
            name: call.name.clone(),
            output,
        }
    }

    async fn try_execute(&self, call: &ToolCall) -> Result<String, ToolError> {
        let tool = self.get(&call.name).ok_or_else(|| {
            ToolError::ToolNotFound(call.name.clone(), self.tool_names().join(", "))
        })?;

        tool.validate_args(&call.args)?;
        tool.call(call.args.clone()).await
    }
}

/// Definition of the ask-human pseudo-tool
pub fn ask_human_definition() -> ToolDefinition {
    ToolDefinition::new(
        ASK_HUMAN_TOOL,
        "Ask the human a question when information needed to answer is missing",
        json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "Question for the human"
                }
            },
            "required": ["question"]
        }),
    )
}

/// Question carried by an ask-human call (`question` or `question_for_human`)
pub fn ask_human_question(call: &ToolCall) -> Option<&str> {
    call.arg_str("question")
        .or_else(|| call.arg_str("question_for_human"))
        .filter(|q| !q.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo() -> Tool {
        Tool::new(
            "echo",
            "Echo the text argument",
            json!({"type": "object", "properties": {"text": {"type": "string"}}}),
            |args| Ok(args["text"].as_str().unwrap_or_default().to_string()),
        )
    }

    #[tokio::test]
    async fn test_execute_success() {
        let registry = ToolRegistry::new().with_tool(echo());
        let call = ToolCall::new("call_1", "echo", json!({"text": "hola"}));

        let result = registry.execute_tool_call(&call).await;
        assert_eq!(result.output, ToolOutput::Success { content: "hola".to_string() });

        let message = result.into_message();
        assert_eq!(message.tool_call_id(), Some("call_1"));
        assert_eq!(message.content(), "hola");
    }

    #[tokio::test]
    async fn test_unknown_tool_becomes_error_content() {
        let registry = ToolRegistry::new().with_tool(echo());
        let call = ToolCall::new("call_2", "missing", json!({}));

        let result = registry.execute_tool_call(&call).await;
        assert!(result.is_error());
        assert_eq!(
            result.into_message().content(),
            "Tool 'missing' not found. Available tools: echo"
        );
    }

    #[tokio::test]
    async fn test_tool_error_and_panic_are_captured() {
        let registry = ToolRegistry::new()
            .with_tool(Tool::new("fails", "", json!({"type": "object"}), |_| {
                Err("backend down".to_string())
            }))
            .with_tool(Tool::new("panics", "", json!({"type": "object"}), |_| {
                panic!("boom")
            }));

        let failed = registry
            .execute_tool_call(&ToolCall::new("c1", "fails", json!({})))
            .await;
        assert_eq!(
            failed.output,
            ToolOutput::Error {
                error: "Tool 'fails' execution failed: backend down".to_string()
            }
        );

        let panicked = registry
            .execute_tool_call(&ToolCall::new("c2", "panics", json!({})))
            .await;
        match panicked.output {
            ToolOutput::Error { error } => assert!(error.contains("boom"), "{}", error),
            other => panic!("Expected error output, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_object_arguments_rejected() {
        let registry = ToolRegistry::new().with_tool(echo());
        let result = registry
            .execute_tool_call(&ToolCall::new("c1", "echo", json!("hola")))
            .await;
        assert!(result.is_error());
    }

    #[tokio::test]
    async fn test_typed_tool() {
        #[derive(Deserialize)]
        struct Args {
            office: String,
        }

        let tool = Tool::typed("sla", "", json!({"type": "object"}), |args: Args| {
            Ok(format!("{}: 97%", args.office))
        });
        assert_eq!(tool.call(json!({"office": "A"})).await.unwrap(), "A: 97%");
        assert!(tool.call(json!({"oficina": "A"})).await.is_err());
    }

    #[test]
    fn test_ask_human_question_aliases() {
        let primary = ToolCall::new("c", ASK_HUMAN_TOOL, json!({"question": "¿Periodo?"}));
        let alias = ToolCall::new("c", ASK_HUMAN_TOOL, json!({"question_for_human": "¿Mes?"}));
        let blank = ToolCall::new("c", ASK_HUMAN_TOOL, json!({"question": "  "}));

        assert_eq!(ask_human_question(&primary), Some("¿Periodo?"));
        assert_eq!(ask_human_question(&alias), Some("¿Mes?"));
        assert_eq!(ask_human_question(&blank), None);
        assert_eq!(ask_human_definition().name, ASK_HUMAN_TOOL);
    }

    #[cfg(feature = "json-validation")]
    #[tokio::test]
    async fn test_schema_validation() {
        let tool = Tool::new(
            "sla",
            "",
            json!({"type": "object", "properties": {"office": {"type": "string"}}, "required": ["office"]}),
            |_| Ok(String::new()),
        );
        assert!(tool.validate_args(&json!({"office": "A"})).is_ok());
        assert!(matches!(
            tool.validate_args(&json!({})),
            Err(ToolError::ValidationError { .. })
        ));
    }
}
