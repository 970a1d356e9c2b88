//! HTTP API: routes, shared state and turn preparation

pub mod handlers;
pub mod middleware;
pub mod models;
pub mod stream;

use crate::config::GraphKind;
use crate::error::{ApiError, ApiResult};
use axum::{
    routing::{delete, get, post},
    Router,
};
use models::UserInput;
use parley_core::messages::Message;
use parley_core::{CompiledGraph, ConversationState, Resume, RunConfig, StateDelta, TurnInput};
use std::sync::Arc;
use stream::StreamFilter;
use uuid::Uuid;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub graph: CompiledGraph<ConversationState>,
    pub filter: Arc<StreamFilter>,
    pub kind: GraphKind,
    /// Model used when a request names none
    pub default_model: String,
}

/// A turn ready to hand to the engine
#[derive(Debug)]
pub struct PreparedTurn {
    pub input: TurnInput<StateDelta>,
    pub config: RunConfig,
}

impl PreparedTurn {
    pub fn is_resume(&self) -> bool {
        matches!(self.input, TurnInput::Resume(_))
    }
}

impl AppState {
    pub fn new(
        graph: CompiledGraph<ConversationState>,
        filter: StreamFilter,
        kind: GraphKind,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            graph,
            filter: Arc::new(filter),
            kind,
            default_model: default_model.into(),
        }
    }

    /// Mint the run identity and decide between a new turn and a resume.
    ///
    /// A thread waiting for the human takes the message as the answer.
    pub async fn prepare_turn(&self, input: &UserInput, stream_tokens: bool) -> ApiResult<PreparedTurn> {
        if input.message.trim().is_empty() {
            return Err(ApiError::BadRequest("message is empty".to_string()));
        }

        let thread_id = input
            .thread_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let model = input.model.as_deref().unwrap_or(&self.default_model);

        let config = RunConfig::new(thread_id)
            .with_model(model)
            .with_stream_tokens(stream_tokens);

        let suspended = self
            .graph
            .get_state(&config.thread_id)
            .await?
            .is_some_and(|snapshot| snapshot.is_suspended());

        let turn_input = if suspended {
            TurnInput::Resume(Resume::new(input.message.clone()))
        } else {
            TurnInput::Update(StateDelta::append(Message::human(input.message.clone())))
        };

        Ok(PreparedTurn {
            input: turn_input,
            config,
        })
    }
}

/// Build the complete API router
pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/stream", post(stream::stream_turn))
        .route("/invoke", post(handlers::invoke))
        .route("/threads/:thread_id", delete(handlers::delete_thread))
        .route("/threads/:thread_id/state", get(handlers::get_thread_state))
        .route("/threads/:thread_id/history", get(handlers::get_thread_history))
        .layer(middleware::cors_layer(cors_origins))
        .layer(middleware::logging_layer())
        .with_state(state)
}
