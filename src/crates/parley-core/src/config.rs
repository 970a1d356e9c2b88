//! Per-invocation configuration

use crate::interrupt::InterruptPolicy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// Default number of supersteps one invocation may run
pub const DEFAULT_RECURSION_LIMIT: usize = 25;

/// Configuration for a single turn or resume on a thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub thread_id: String,

    /// Identifier for this invocation, used in logs
    #[serde(default = "new_run_id")]
    pub run_id: String,

    /// Free-form runtime options read by nodes (e.g. `model`)
    #[serde(default)]
    pub configurable: HashMap<String, Value>,

    /// Whether model nodes should forward tokens as they arrive
    #[serde(default)]
    pub stream_tokens: bool,
}

fn new_run_id() -> String {
    Uuid::new_v4().to_string()
}

impl RunConfig {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            run_id: new_run_id(),
            configurable: HashMap::new(),
            stream_tokens: false,
        }
    }

    pub fn with_configurable(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.configurable.insert(key.into(), value.into());
        self
    }

    /// Model name override for model nodes
    pub fn with_model(self, model: impl Into<String>) -> Self {
        self.with_configurable("model", model.into())
    }

    pub fn with_stream_tokens(mut self, enabled: bool) -> Self {
        self.stream_tokens = enabled;
        self
    }

    pub fn model(&self) -> Option<&str> {
        self.configurable.get("model").and_then(Value::as_str)
    }
}

/// Engine-wide limits fixed at compile time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionLimits {
    pub recursion_limit: usize,
    pub interrupts: InterruptPolicy,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            interrupts: InterruptPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_override() {
        let config = RunConfig::new("t1").with_model("gpt-4o-mini");
        assert_eq!(config.model(), Some("gpt-4o-mini"));
        assert_eq!(RunConfig::new("t1").model(), None);
    }

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(RunConfig::new("t1").run_id, RunConfig::new("t1").run_id);
    }
}
