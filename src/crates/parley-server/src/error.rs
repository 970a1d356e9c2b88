//! API error types and HTTP response conversion
//!
//! Engine failures are mapped onto status codes: protocol violations become `409 Conflict`,
//! model failures `502 Bad Gateway`, thread ids the store cannot hold `400`, other store and
//! engine failures `500`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use parley_checkpoint::CheckpointError;
use parley_core::GraphError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API error response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for programmatic handling
    pub code: String,
}

impl ApiErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            code: code.into(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The engine refused or failed the turn
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Graph(err) => match err {
                GraphError::Protocol(_) => StatusCode::CONFLICT,
                GraphError::Model(_) => StatusCode::BAD_GATEWAY,
                GraphError::Checkpoint(CheckpointError::ThreadIdTooLong { .. }) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Graph(err) => match err {
                GraphError::Protocol(_) => "PROTOCOL_VIOLATION",
                GraphError::Model(_) => "MODEL_ERROR",
                GraphError::RecursionLimit { .. } => "RECURSION_LIMIT",
                GraphError::Checkpoint(_) => "CHECKPOINT_ERROR",
                _ => "GRAPH_ERROR",
            },
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NotFound",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::Graph(GraphError::Protocol(_)) => "Conflict",
            ApiError::Graph(_) => "GraphError",
            ApiError::InternalError(_) => "InternalError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ApiErrorResponse::new(self.error_type(), self.to_string(), self.code());

        if status.is_server_error() {
            tracing::error!(code = body.code, "API error: {}", body.message);
        } else {
            tracing::warn!(code = body.code, "API error: {}", body.message);
        }

        (status, Json(body)).into_response()
    }
}
