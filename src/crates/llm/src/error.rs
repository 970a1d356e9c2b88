//! Errors raised by the model client

use parley_core::GraphError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, LlmError>;

#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport failure (connection refused, reset, client timeout)
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// 401/403 from the provider
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("API key not found: {0}")]
    ApiKeyNotFound(String),

    /// 404, usually an unknown model or Azure deployment
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// 5xx from the provider
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// 429 from the provider
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The body did not have the chat-completions shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request timeout: {0}")]
    Timeout(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl LlmError {
    /// Map a non-success HTTP status and its body to an error
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::AuthenticationError(body),
            404 => Self::ModelNotFound(body),
            408 => Self::Timeout(body),
            429 => Self::RateLimitExceeded(body),
            400 | 422 => Self::InvalidRequest(body),
            500..=599 => Self::ServiceUnavailable(format!("{}: {}", status, body)),
            _ => Self::ProviderError(format!("{}: {}", status, body)),
        }
    }

    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HttpError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::ServiceUnavailable(_) | Self::Timeout(_) | Self::RateLimitExceeded(_) => true,
            _ => false,
        }
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::AuthenticationError(_) | Self::ApiKeyNotFound(_))
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl From<tooling::ToolingError> for LlmError {
    fn from(err: tooling::ToolingError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

/// Provider failures abort the turn as model errors
impl From<LlmError> for GraphError {
    fn from(err: LlmError) -> Self {
        GraphError::Model(err.to_string())
    }
}
