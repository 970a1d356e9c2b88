//! Suspend/resume protocol types
//!
//! A node suspends by returning [`NodeOutcome::Suspend`](crate::command::NodeOutcome). The
//! engine stores an [`Interrupt`] on the thread's head checkpoint: which node suspended,
//! the prompt it emitted, and when. Until that interrupt is consumed the thread accepts
//! exactly one kind of request, a [`Resume`] aimed at that node.
//!
//! ```text
//! invoke("dame el SLA") ──► ask_human suspends ──► head.pending_interrupt = {node: ask_human}
//!                                                        │
//! resume("septiembre") ──► ask_human re-entered with "septiembre" ──► turn continues
//! ```
//!
//! Optionally an [`InterruptPolicy`] bounds how long a suspension stays valid.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub use parley_checkpoint::PendingInterrupt as Interrupt;

/// A human's answer to an outstanding suspension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resume {
    pub value: Value,

    /// Node the caller believes is suspended; checked against the thread when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
}

impl Resume {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            node: None,
        }
    }

    /// Resume that must land on `node`
    pub fn at(node: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            node: Some(node.into()),
        }
    }
}

/// Lifetime rules for outstanding suspensions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterruptPolicy {
    /// Suspensions older than this are rejected on resume; `None` keeps them forever
    pub ttl: Option<Duration>,
}

impl InterruptPolicy {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl: Some(ttl) }
    }

    pub fn is_expired(&self, interrupt: &Interrupt, now: DateTime<Utc>) -> bool {
        self.ttl
            .map(|ttl| interrupt.is_expired(ttl, now))
            .unwrap_or(false)
    }
}

/// Text form of a resume or prompt value: strings as-is, anything else as JSON
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
