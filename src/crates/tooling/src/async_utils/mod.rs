//! Async helpers
//!
//! ```rust,ignore
//! use tooling::async_utils::{with_retry_if, RetryPolicy};
//!
//! let policy = RetryPolicy::new(3).with_initial_interval(0.5);
//! let body = with_retry_if(&policy, |e: &MyError| e.is_transient(), || call_api()).await?;
//! ```

pub mod retry;

pub use retry::{with_retry, with_retry_if, RetryPolicy};
