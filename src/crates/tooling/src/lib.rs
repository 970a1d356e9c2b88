//! Helpers shared across the parley workspace
//!
//! - `config` - typed environment variable loading
//! - `async_utils` - retry with exponential backoff and jitter
//! - `logging` - timing helpers on top of `tracing`

pub mod async_utils;
pub mod config;
pub mod logging;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolingError {
    /// Variable present but not valid UTF-8
    #[error("Environment variable {0} contains invalid UTF-8")]
    InvalidUnicode(String),

    #[error("Failed to parse environment variable {key}: {message}")]
    Parse { key: String, message: String },
}

pub type Result<T> = std::result::Result<T, ToolingError>;

/// Crate version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }

    #[test]
    fn test_parse_error_names_key() {
        let err = ToolingError::Parse {
            key: "PARLEY_PORT".into(),
            message: "invalid digit".into(),
        };
        assert!(err.to_string().contains("PARLEY_PORT"));
    }
}
