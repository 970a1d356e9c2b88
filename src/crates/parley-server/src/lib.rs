//! HTTP front end for parley agents
//!
//! Serves a compiled conversation graph over HTTP:
//!
//! - `POST /stream` - run or resume a turn, streaming visible output as server-sent events
//! - `POST /invoke` - the same turn without streaming
//! - `GET /threads/:thread_id/state`, `GET /threads/:thread_id/history` - inspect a thread
//! - `DELETE /threads/:thread_id` - forget a thread
//! - `GET /health`
//!
//! [`app::build_app`] assembles the router from a [`config::ServerConfig`], a chat model and
//! the tools the agent may call.

pub mod api;
pub mod app;
pub mod config;
pub mod error;

pub use api::{create_router, AppState};
pub use app::{build_app, build_state, AppError, ConfiguredContext};
pub use config::{GraphKind, ServerConfig};
pub use error::{ApiError, ApiResult};
