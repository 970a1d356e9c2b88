//! File-backed checkpoint storage
//!
//! One file per thread under a base directory holds that thread's full history. Writes go
//! to a temporary file that is renamed over the old one, so a crash mid-write leaves the
//! previous head intact. Suspended threads survive restarts.
//!
//! File names are the hex encoding of the thread id, so any id is a valid name as long as it
//! fits in [`MAX_THREAD_ID_BYTES`]. Longer ids are rejected with
//! [`CheckpointError::ThreadIdTooLong`].
//!
//! Every `put` rewrites the thread file, so history is capped at [`DEFAULT_MAX_HISTORY`]
//! checkpoints unless [`FileCheckpointSaver::with_max_history`] says otherwise. Writes to the
//! same thread are serialized; different threads write independently.

use crate::{
    checkpoint::{Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointTuple},
    error::{CheckpointError, Result},
    locks::{ThreadGuard, ThreadLocks},
    serializer::{JsonSerializer, SerializerProtocol},
    traits::{CheckpointSaver, CheckpointStream},
};
use async_trait::async_trait;
use futures::stream;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Checkpoints kept per thread file unless configured otherwise
pub const DEFAULT_MAX_HISTORY: usize = 100;

/// Longest thread id that still yields a valid file name once hex-encoded
pub const MAX_THREAD_ID_BYTES: usize = 100;

/// Checkpoint saver persisting each thread to its own file
#[derive(Debug)]
pub struct FileCheckpointSaver<S = JsonSerializer> {
    dir: PathBuf,
    serializer: S,
    locks: ThreadLocks,
    writes: ThreadLocks,
    max_history: usize,
}

impl FileCheckpointSaver<JsonSerializer> {
    /// Open (creating if needed) a JSON store under `dir`
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        Self::with_serializer(dir, JsonSerializer).await
    }
}

impl<S: SerializerProtocol> FileCheckpointSaver<S> {
    pub async fn with_serializer(dir: impl AsRef<Path>, serializer: S) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        tracing::debug!(dir = %dir.display(), "Opened file checkpoint store");

        Ok(Self {
            dir,
            serializer,
            locks: ThreadLocks::new(),
            writes: ThreadLocks::new(),
            max_history: DEFAULT_MAX_HISTORY,
        })
    }

    /// Keep at most `max` checkpoints per thread file
    pub fn with_max_history(mut self, max: usize) -> Self {
        self.max_history = max.max(1);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn thread_path(&self, thread_id: &str) -> Result<PathBuf> {
        if thread_id.len() > MAX_THREAD_ID_BYTES {
            return Err(CheckpointError::ThreadIdTooLong {
                len: thread_id.len(),
                max: MAX_THREAD_ID_BYTES,
            });
        }
        let encoded: String = thread_id.bytes().map(|b| format!("{:02x}", b)).collect();
        Ok(self
            .dir
            .join(format!("{}.{}", encoded, self.serializer.extension())))
    }

    async fn read_thread(&self, thread_id: &str) -> Result<Vec<CheckpointTuple>> {
        match tokio::fs::read(self.thread_path(thread_id)?).await {
            Ok(bytes) => self.serializer.loads(&bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_thread(&self, thread_id: &str, entries: &[CheckpointTuple]) -> Result<()> {
        let path = self.thread_path(thread_id)?;
        let tmp = path.with_extension("tmp");
        let bytes = self.serializer.dumps(&entries)?;

        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| CheckpointError::Replace { path, source })
    }
}

#[async_trait]
impl<S: SerializerProtocol> CheckpointSaver for FileCheckpointSaver<S> {
    async fn get_tuple(&self, config: &CheckpointConfig) -> Result<Option<CheckpointTuple>> {
        let thread_id = config.require_thread_id()?;
        let mut entries = self.read_thread(thread_id).await?;

        Ok(match &config.checkpoint_id {
            Some(id) => entries.into_iter().find(|e| &e.checkpoint.id == id),
            None => entries.pop(),
        })
    }

    async fn list(
        &self,
        config: &CheckpointConfig,
        limit: Option<usize>,
    ) -> Result<CheckpointStream> {
        let thread_id = config.require_thread_id()?;
        let entries = self.read_thread(thread_id).await?;

        let results: Vec<Result<CheckpointTuple>> = entries
            .into_iter()
            .rev()
            .take(limit.unwrap_or(usize::MAX))
            .map(Ok)
            .collect();

        Ok(Box::pin(stream::iter(results)))
    }

    async fn put(
        &self,
        config: &CheckpointConfig,
        checkpoint: Checkpoint,
        metadata: CheckpointMetadata,
    ) -> Result<CheckpointConfig> {
        let thread_id = config.require_thread_id()?;
        let _write = self.writes.acquire(thread_id).await;

        let mut entries = self.read_thread(thread_id).await?;
        let checkpoint_config = CheckpointConfig {
            thread_id: Some(thread_id.to_string()),
            checkpoint_id: Some(checkpoint.id.clone()),
            extra: config.extra.clone(),
        };

        let parent_config = entries.last().map(|parent| parent.config.clone());
        entries.push(CheckpointTuple {
            config: checkpoint_config.clone(),
            checkpoint,
            metadata,
            parent_config,
        });

        if entries.len() > self.max_history {
            let excess = entries.len() - self.max_history;
            entries.drain(..excess);
        }

        self.write_thread(thread_id, &entries).await?;
        Ok(checkpoint_config)
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let path = self.thread_path(thread_id)?;
        {
            let _write = self.writes.acquire(thread_id).await;
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        self.writes.prune();
        self.locks.prune();
        Ok(())
    }

    async fn lock_thread(&self, thread_id: &str) -> ThreadGuard {
        self.locks.acquire(thread_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::PendingInterrupt;
    use crate::serializer::PrettyJsonSerializer;
    use futures::StreamExt;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_suspended_thread_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = CheckpointConfig::for_thread("user/42");

        {
            let saver = FileCheckpointSaver::open(dir.path()).await.unwrap();
            let checkpoint = Checkpoint::new(json!({"messages": []}), 2)
                .with_next(vec!["ask_human".to_string()])
                .with_interrupt(PendingInterrupt::new("ask_human", json!("¿Periodo?")));
            saver
                .put(&config, checkpoint, CheckpointMetadata::new())
                .await
                .unwrap();
        }

        let reopened = FileCheckpointSaver::open(dir.path()).await.unwrap();
        let head = reopened.get(&config).await.unwrap().unwrap();
        assert_eq!(head.next, vec!["ask_human"]);
        assert_eq!(head.pending_interrupt.unwrap().node, "ask_human");
    }

    #[tokio::test]
    async fn test_history_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let saver = FileCheckpointSaver::with_serializer(dir.path(), PrettyJsonSerializer)
            .await
            .unwrap()
            .with_max_history(2);
        let config = CheckpointConfig::for_thread("t1");

        for step in 0..3 {
            saver
                .put(&config, Checkpoint::new(json!(step), step), CheckpointMetadata::new())
                .await
                .unwrap();
        }

        let head = saver.get_tuple(&config).await.unwrap().unwrap();
        assert_eq!(head.checkpoint.step, 2);
        assert!(head.parent_config.is_some());

        saver.delete_thread("t1").await.unwrap();
        assert!(saver.get(&config).await.unwrap().is_none());
        saver.delete_thread("t1").await.unwrap();
    }

    #[tokio::test]
    async fn test_default_history_cap() {
        let dir = tempfile::tempdir().unwrap();
        let saver = FileCheckpointSaver::open(dir.path()).await.unwrap();
        let config = CheckpointConfig::for_thread("t1");

        for step in 0..DEFAULT_MAX_HISTORY as i32 + 5 {
            saver
                .put(&config, Checkpoint::new(json!(step), step), CheckpointMetadata::new())
                .await
                .unwrap();
        }

        let history: Vec<_> = saver.list(&config, None).await.unwrap().collect().await;
        assert_eq!(history.len(), DEFAULT_MAX_HISTORY);
    }

    #[tokio::test]
    async fn test_long_thread_id_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let saver = FileCheckpointSaver::open(dir.path()).await.unwrap();

        let longest = "x".repeat(MAX_THREAD_ID_BYTES);
        saver
            .put(
                &CheckpointConfig::for_thread(&longest),
                Checkpoint::new(json!({}), 0),
                CheckpointMetadata::new(),
            )
            .await
            .unwrap();

        let too_long = "x".repeat(MAX_THREAD_ID_BYTES + 1);
        let err = saver
            .put(
                &CheckpointConfig::for_thread(&too_long),
                Checkpoint::new(json!({}), 0),
                CheckpointMetadata::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CheckpointError::ThreadIdTooLong { len: 101, max: 100 }
        ));
        assert!(saver.delete_thread(&too_long).await.is_err());
    }

    #[tokio::test]
    async fn test_threads_write_independently() {
        let dir = tempfile::tempdir().unwrap();
        let saver = Arc::new(FileCheckpointSaver::open(dir.path()).await.unwrap());

        let writers = (0..4).map(|n| {
            let saver = saver.clone();
            tokio::spawn(async move {
                let config = CheckpointConfig::for_thread(format!("t{}", n));
                for step in 0..5 {
                    saver
                        .put(&config, Checkpoint::new(json!(step), step), CheckpointMetadata::new())
                        .await
                        .unwrap();
                }
            })
        });
        for writer in futures::future::join_all(writers).await {
            writer.unwrap();
        }

        for n in 0..4 {
            let config = CheckpointConfig::for_thread(format!("t{}", n));
            let head = saver.get_tuple(&config).await.unwrap().unwrap();
            assert_eq!(head.checkpoint.step, 4);
        }
    }
}
