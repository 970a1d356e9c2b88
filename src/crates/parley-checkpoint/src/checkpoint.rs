//! Checkpoint data structures
//!
//! A [`Checkpoint`] is a complete, self-contained snapshot of one conversation thread taken
//! at a step boundary. Besides the serialized state values it records what the engine needs
//! to pick the thread up again later:
//!
//! - `next` - nodes scheduled to run when execution continues
//! - `pending_interrupt` - the outstanding suspension, if a node asked for human input
//!
//! ```text
//! CheckpointTuple
//! ├── config          thread_id + checkpoint_id identifying this snapshot
//! ├── checkpoint
//! │   ├── step        superstep counter within the thread
//! │   ├── values      serialized conversation state
//! │   ├── next        ["ask_human"]
//! │   └── pending_interrupt
//! │       ├── node    "ask_human"
//! │       └── value   "Por favor, proporciona el periodo de tiempo"
//! ├── metadata        source (input/loop/resume/update), step, nodes written
//! └── parent_config   snapshot this one was derived from
//! ```
//!
//! Checkpoints are plain values. Savers store copies, never live references, and every
//! `put` replaces the thread's head atomically.

use crate::error::{CheckpointError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// Unique identifier for a checkpoint
pub type CheckpointId = String;

/// How a checkpoint came to be written
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointSource {
    /// Input applied at the start of a turn
    Input,
    /// Written after a superstep
    Loop,
    /// Written after a suspended node was resumed
    Resume,
    /// Written by an external state update
    Update,
}

/// Metadata stored next to each checkpoint
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CheckpointMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<CheckpointSource>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<i32>,

    /// Nodes whose output produced this checkpoint
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub writes: Vec<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl CheckpointMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: CheckpointSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_step(mut self, step: i32) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_writes(mut self, writes: Vec<String>) -> Self {
        self.writes = writes;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// An outstanding suspension recorded on a thread.
///
/// At most one exists per thread. It names the node that suspended and carries the
/// prompt that node emitted for the human.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingInterrupt {
    pub id: String,
    pub node: String,
    pub value: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl PendingInterrupt {
    pub fn new(node: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            node: node.into(),
            value,
            created_at: Utc::now(),
        }
    }

    /// Whether this suspension is older than `ttl` at time `now`
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now - self.created_at > ttl,
            Err(_) => false,
        }
    }
}

/// Snapshot of a thread's state at a step boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Format version
    pub v: i32,

    pub id: CheckpointId,

    pub ts: DateTime<Utc>,

    pub step: i32,

    /// Serialized conversation state
    pub values: serde_json::Value,

    /// Nodes scheduled to run when the thread continues
    #[serde(default)]
    pub next: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_interrupt: Option<PendingInterrupt>,
}

impl Checkpoint {
    pub const CURRENT_VERSION: i32 = 1;

    pub fn new(values: serde_json::Value, step: i32) -> Self {
        Self {
            v: Self::CURRENT_VERSION,
            id: Uuid::new_v4().to_string(),
            ts: Utc::now(),
            step,
            values,
            next: Vec::new(),
            pending_interrupt: None,
        }
    }

    pub fn with_next(mut self, next: Vec<String>) -> Self {
        self.next = next;
        self
    }

    pub fn with_interrupt(mut self, interrupt: PendingInterrupt) -> Self {
        self.pending_interrupt = Some(interrupt);
        self
    }

    pub fn is_suspended(&self) -> bool {
        self.pending_interrupt.is_some()
    }
}

/// Identifies a thread, and optionally one checkpoint within it
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CheckpointConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_id: Option<CheckpointId>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl CheckpointConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Config addressing the latest checkpoint of `thread_id`
    pub fn for_thread(thread_id: impl Into<String>) -> Self {
        Self::new().with_thread_id(thread_id)
    }

    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    pub fn with_checkpoint_id(mut self, checkpoint_id: impl Into<CheckpointId>) -> Self {
        self.checkpoint_id = Some(checkpoint_id.into());
        self
    }

    /// The thread id, or an error when the config does not name one
    pub fn require_thread_id(&self) -> Result<&str> {
        self.thread_id
            .as_deref()
            .ok_or(CheckpointError::MissingThreadId)
    }
}

/// A checkpoint together with the config that addresses it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointTuple {
    pub config: CheckpointConfig,

    pub checkpoint: Checkpoint,

    pub metadata: CheckpointMetadata,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_config: Option<CheckpointConfig>,
}
