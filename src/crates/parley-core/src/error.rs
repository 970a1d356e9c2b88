//! Error types for graph construction and execution
//!
//! ```text
//! GraphError
//! ├── Validation         - Graph structure errors found by compile()
//! ├── NodeExecution      - A node returned an error
//! ├── Model              - The language model could not be invoked
//! ├── Protocol           - Suspend/resume protocol violations (see ProtocolError)
//! ├── RecursionLimit     - A turn ran more supersteps than allowed
//! ├── Checkpoint         - Persistence errors
//! ├── Serialization      - State could not be (de)serialized
//! ├── State              - State update could not be applied
//! ├── Configuration      - Invalid runtime configuration
//! └── Custom             - Application-defined errors
//! ```
//!
//! Errors from this module abort the current turn. Failures a conversation can recover from
//! (an unknown tool, a tool that panicked) never reach this type: they are turned into
//! tool-result messages where they occur.
//!
//! # Matching protocol errors
//!
//! ```rust
//! use parley_core::error::{GraphError, ProtocolError};
//!
//! fn describe(err: &GraphError) -> &'static str {
//!     match err {
//!         GraphError::Protocol(ProtocolError::NoPendingInterrupt { .. }) => "nothing to resume",
//!         GraphError::Protocol(ProtocolError::SuspensionOutstanding { .. }) => "answer first",
//!         GraphError::Protocol(_) => "rejected",
//!         _ => "failed",
//!     }
//! }
//! ```

use parley_checkpoint::CheckpointError;
use thiserror::Error;

/// Result type for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors produced while building or running a graph
#[derive(Error, Debug)]
pub enum GraphError {
    /// Graph structure is invalid
    #[error("Graph validation failed: {0}")]
    Validation(String),

    /// A node failed
    #[error("Node '{node}' execution failed: {error}")]
    NodeExecution { node: String, error: String },

    /// The language model capability failed or returned something unusable
    #[error("Model invocation failed: {0}")]
    Model(String),

    /// The suspend/resume protocol was violated
    #[error("Protocol violation: {0}")]
    Protocol(#[from] ProtocolError),

    /// The turn did not reach a terminal node in time
    #[error("Recursion limit of {limit} steps reached without hitting a terminal node")]
    RecursionLimit { limit: usize },

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("State error: {0}")]
    State(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{0}")]
    Custom(String),
}

impl GraphError {
    pub fn node_execution(node: impl Into<String>, error: impl ToString) -> Self {
        Self::NodeExecution {
            node: node.into(),
            error: error.to_string(),
        }
    }

    pub fn model(error: impl ToString) -> Self {
        Self::Model(error.to_string())
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }
}

/// Violations of the suspend/resume protocol.
///
/// A thread has at most one outstanding suspension. While it exists the only valid request
/// is a resume aimed at the node that suspended; without one, a resume is invalid.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("thread '{thread_id}' has no outstanding suspension to resume")]
    NoPendingInterrupt { thread_id: String },

    #[error("thread '{thread_id}' is suspended at '{expected}', not '{actual}'")]
    WrongNode {
        thread_id: String,
        expected: String,
        actual: String,
    },

    #[error("thread '{thread_id}' is suspended at '{node}'; resume it before starting a new turn")]
    SuspensionOutstanding { thread_id: String, node: String },

    #[error("suspension of thread '{thread_id}' at '{node}' has expired")]
    InterruptExpired { thread_id: String, node: String },

    #[error("thread '{thread_id}' is suspended at '{node}', which this graph does not contain")]
    UnknownNode { thread_id: String, node: String },

    #[error("nodes {nodes:?} suspended in the same step; only one suspension is allowed")]
    ConcurrentSuspend { nodes: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_conversion() {
        let err: GraphError = ProtocolError::NoPendingInterrupt {
            thread_id: "t1".to_string(),
        }
        .into();

        assert!(err.is_protocol());
        assert_eq!(
            err.to_string(),
            "Protocol violation: thread 't1' has no outstanding suspension to resume"
        );
    }

    #[test]
    fn test_node_execution_message() {
        let err = GraphError::node_execution("agent", "boom");
        assert_eq!(err.to_string(), "Node 'agent' execution failed: boom");
        assert!(!err.is_protocol());
    }
}
