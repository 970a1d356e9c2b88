//! CORS and request logging layers

use axum::http::{request::Parts, HeaderName, HeaderValue};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use super::stream::THREAD_ID_HEADER;

static LOCALHOST_ORIGIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^http://localhost(:\d+)?$").expect("localhost origin pattern is valid"));

/// Whether `origin` may call the API: listed explicitly, or any `http://localhost:<port>`
pub fn origin_allowed(allowed: &HashSet<String>, origin: &str) -> bool {
    allowed.contains(origin) || LOCALHOST_ORIGIN.is_match(origin)
}

/// CORS layer for the configured allow-list, with credentials
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: HashSet<String> = origins.iter().cloned().collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _: &Parts| {
            origin
                .to_str()
                .map(|origin| origin_allowed(&allowed, origin))
                .unwrap_or(false)
        }))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .expose_headers([HeaderName::from_static(THREAD_ID_HEADER)])
}

/// Request logging middleware
pub fn logging_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .include_headers(false),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_allow_list() {
        let allowed: HashSet<String> = ["http://127.0.0.1:4040".to_string()].into_iter().collect();

        assert!(origin_allowed(&allowed, "http://127.0.0.1:4040"));
        assert!(origin_allowed(&allowed, "http://localhost"));
        assert!(origin_allowed(&allowed, "http://localhost:5173"));
        assert!(!origin_allowed(&allowed, "http://127.0.0.1:9999"));
        assert!(!origin_allowed(&allowed, "https://localhost:3000"));
        assert!(!origin_allowed(&allowed, "http://localhost.evil.com"));
    }
}
