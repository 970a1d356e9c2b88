//! Result and snapshot types of the execution engine

use crate::error::Result;
use crate::interrupt::{Interrupt, Resume};
use chrono::{DateTime, Utc};
use futures::stream::Stream;
use parley_checkpoint::{CheckpointMetadata, CheckpointTuple};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::pin::Pin;

/// What starts an invocation
#[derive(Debug, Clone)]
pub enum TurnInput<U> {
    /// A new turn, beginning with this update (usually the human's message)
    Update(U),
    /// The answer to the thread's outstanding suspension
    Resume(Resume),
}

/// How an invocation ended
#[derive(Debug, Clone)]
pub enum TurnOutcome<S> {
    /// Every branch reached END
    Completed { state: S },
    /// A node is waiting for human input
    Suspended { state: S, interrupt: Interrupt },
}

impl<S> TurnOutcome<S> {
    pub fn state(&self) -> &S {
        match self {
            Self::Completed { state } | Self::Suspended { state, .. } => state,
        }
    }

    pub fn into_state(self) -> S {
        match self {
            Self::Completed { state } | Self::Suspended { state, .. } => state,
        }
    }

    pub fn interrupt(&self) -> Option<&Interrupt> {
        match self {
            Self::Suspended { interrupt, .. } => Some(interrupt),
            Self::Completed { .. } => None,
        }
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, Self::Suspended { .. })
    }
}

/// A thread's state as recorded by one checkpoint
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot<S> {
    pub values: S,

    /// Nodes that run when the thread continues; non-empty while suspended
    pub next: Vec<String>,

    pub interrupt: Option<Interrupt>,

    pub thread_id: String,
    pub checkpoint_id: String,
    pub step: i32,
    pub created_at: DateTime<Utc>,
    pub metadata: CheckpointMetadata,
}

impl<S: DeserializeOwned> StateSnapshot<S> {
    pub(crate) fn from_tuple(tuple: CheckpointTuple) -> Result<Self> {
        let checkpoint = tuple.checkpoint;
        Ok(Self {
            values: serde_json::from_value(checkpoint.values)?,
            next: checkpoint.next,
            interrupt: checkpoint.pending_interrupt,
            thread_id: tuple.config.thread_id.unwrap_or_default(),
            checkpoint_id: checkpoint.id,
            step: checkpoint.step,
            created_at: checkpoint.ts,
            metadata: tuple.metadata,
        })
    }
}

impl<S> StateSnapshot<S> {
    pub fn is_suspended(&self) -> bool {
        self.interrupt.is_some()
    }
}

/// Snapshots of a thread, newest first
pub type StateSnapshotStream<S> = Pin<Box<dyn Stream<Item = Result<StateSnapshot<S>>> + Send>>;
