//! Checkpoint storage for parley conversation threads
//!
//! Every conversation thread has a history of [`Checkpoint`]s, one per step boundary. The
//! newest one (the *head*) is what a new turn or a resume starts from. A checkpoint carries
//! the serialized conversation state, the nodes scheduled next, and the thread's outstanding
//! suspension if a node is waiting for human input.
//!
//! # Savers
//!
//! - [`InMemoryCheckpointSaver`] - process-local, for development and tests
//! - [`FileCheckpointSaver`] - one file per thread, survives restarts
//!
//! Both implement [`CheckpointSaver`], which also hands out per-thread execution locks
//! ([`ThreadGuard`]) so that turns and resumes on one thread never interleave.
//!
//! # Example
//!
//! ```rust,no_run
//! use parley_checkpoint::{Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointSaver,
//!     InMemoryCheckpointSaver};
//! use serde_json::json;
//!
//! # async fn example() -> parley_checkpoint::Result<()> {
//! let saver = InMemoryCheckpointSaver::new();
//! let config = CheckpointConfig::for_thread("thread-1");
//!
//! let _guard = saver.lock_thread("thread-1").await;
//! saver.put(&config, Checkpoint::new(json!({"messages": []}), 0), CheckpointMetadata::new()).await?;
//! let head = saver.get(&config).await?;
//! # Ok(())
//! # }
//! ```

pub mod checkpoint;
pub mod error;
pub mod file;
pub mod locks;
pub mod memory;
pub mod serializer;
pub mod traits;

pub use checkpoint::{
    Checkpoint, CheckpointConfig, CheckpointId, CheckpointMetadata, CheckpointSource,
    CheckpointTuple, PendingInterrupt,
};
pub use error::{CheckpointError, Result};
pub use file::{FileCheckpointSaver, DEFAULT_MAX_HISTORY, MAX_THREAD_ID_BYTES};
pub use locks::{ThreadGuard, ThreadLocks};
pub use memory::InMemoryCheckpointSaver;
pub use serializer::{JsonSerializer, PrettyJsonSerializer, SerializerProtocol};
pub use traits::{CheckpointSaver, CheckpointStream};
