//! Tool definitions bound to model requests

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Function description sent to the model
///
/// `parameters` is a JSON Schema for the argument object. Providers that use the OpenAI
/// function-calling format receive it unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}
