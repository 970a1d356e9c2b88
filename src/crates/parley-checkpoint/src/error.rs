//! Checkpoint store errors

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CheckpointError>;

#[derive(Error, Debug)]
pub enum CheckpointError {
    /// A thread-scoped operation got a config without a thread id
    #[error("thread_id is required")]
    MissingThreadId,

    /// Thread history could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The thread id cannot be turned into a file name
    #[error("thread_id is {len} bytes; file storage accepts at most {max}")]
    ThreadIdTooLong { len: usize, max: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The new thread file could not be moved over the old one; the old head is intact
    #[error("Failed to replace thread file {path}: {source}")]
    Replace {
        path: PathBuf,
        source: std::io::Error,
    },
}
