//! Errors raised while building prebuilt agents

use thiserror::Error;

/// Result type for prebuilt operations
pub type Result<T> = std::result::Result<T, PrebuiltError>;

#[derive(Error, Debug)]
pub enum PrebuiltError {
    /// The selection pattern is not a valid regular expression or lacks a capture group
    #[error("Invalid selection pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid agent configuration: {0}")]
    Configuration(String),

    #[error("Graph error: {0}")]
    Graph(#[from] parley_core::GraphError),
}

impl From<regex::Error> for PrebuiltError {
    fn from(err: regex::Error) -> Self {
        Self::InvalidPattern(err.to_string())
    }
}

impl From<PrebuiltError> for parley_core::GraphError {
    fn from(err: PrebuiltError) -> Self {
        match err {
            PrebuiltError::Graph(inner) => inner,
            other => parley_core::GraphError::Configuration(other.to_string()),
        }
    }
}
