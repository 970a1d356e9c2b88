//! Non-streaming endpoint handlers

use super::models::{HealthResponse, HistoryQuery, InvokeResponse, UserInput};
use super::stream::StreamEvent;
use super::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use futures::{StreamExt, TryStreamExt};
use parley_core::{ConversationState, GraphEvent, StateSnapshot};
use tooling::logging::timed_info;

/// Handler for GET /health
pub async fn health(State(app): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::ok(app.kind.as_str()))
}

/// Handler for POST /invoke
///
/// Runs the turn to completion or suspension and returns the last message the streaming
/// endpoint would have shown.
pub async fn invoke(
    State(app): State<AppState>,
    Json(input): Json<UserInput>,
) -> ApiResult<Json<InvokeResponse>> {
    let turn = app.prepare_turn(&input, false).await?;
    let thread_id = turn.config.thread_id.clone();
    let run_id = turn.config.run_id.clone();
    let mut events = app.graph.stream(turn.input, turn.config);

    let collect = async {
        let mut message = None;
        let mut interrupt = None;
        while let Some(event) = events.next().await {
            let event = event?;
            if let GraphEvent::Interrupted { interrupt: pending } = &event {
                interrupt = Some(pending.clone());
            }
            for frame in app.filter.render(&event, &run_id) {
                match frame {
                    StreamEvent::Message(chat) => message = Some(chat),
                    StreamEvent::Error(err) => return Err(ApiError::InternalError(err)),
                    StreamEvent::Token(_) => {}
                }
            }
        }
        Ok::<_, ApiError>((message, interrupt))
    };
    let (message, interrupt) = timed_info("invoke", collect).await?;

    Ok(Json(InvokeResponse {
        thread_id,
        run_id,
        message,
        interrupt,
    }))
}

/// Handler for GET /threads/:thread_id/state
pub async fn get_thread_state(
    State(app): State<AppState>,
    Path(thread_id): Path<String>,
) -> ApiResult<Json<StateSnapshot<ConversationState>>> {
    let snapshot = app
        .graph
        .get_state(&thread_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("thread '{}'", thread_id)))?;
    Ok(Json(snapshot))
}

/// Handler for GET /threads/:thread_id/history
pub async fn get_thread_history(
    State(app): State<AppState>,
    Path(thread_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<StateSnapshot<ConversationState>>>> {
    let history: Vec<_> = app
        .graph
        .get_state_history(&thread_id, query.limit)
        .await?
        .try_collect()
        .await?;

    if history.is_empty() {
        return Err(ApiError::NotFound(format!("thread '{}'", thread_id)));
    }
    Ok(Json(history))
}

/// Handler for DELETE /threads/:thread_id
pub async fn delete_thread(
    State(app): State<AppState>,
    Path(thread_id): Path<String>,
) -> ApiResult<StatusCode> {
    app.graph.delete_thread(&thread_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
