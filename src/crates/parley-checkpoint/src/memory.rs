//! In-memory checkpoint storage
//!
//! [`InMemoryCheckpointSaver`] keeps every thread's history in an
//! `Arc<RwLock<HashMap<thread_id, Vec<entry>>>>`. It is the default store for development
//! and tests: fast, process-local, and gone on restart.
//!
//! ```rust,ignore
//! use parley_checkpoint::{CheckpointSaver, InMemoryCheckpointSaver};
//! use std::sync::Arc;
//!
//! let saver: Arc<dyn CheckpointSaver> = Arc::new(InMemoryCheckpointSaver::new());
//! ```
//!
//! Histories grow without bound unless [`with_max_history`](InMemoryCheckpointSaver::with_max_history)
//! caps them; the cap keeps the newest entries.

use crate::{
    checkpoint::{Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointTuple},
    error::Result,
    locks::{ThreadGuard, ThreadLocks},
    traits::{CheckpointSaver, CheckpointStream},
};
use async_trait::async_trait;
use futures::stream;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type CheckpointStorage = Arc<RwLock<HashMap<String, Vec<CheckpointTuple>>>>;

/// Thread-safe, process-local checkpoint saver
#[derive(Debug, Clone)]
pub struct InMemoryCheckpointSaver {
    storage: CheckpointStorage,
    locks: ThreadLocks,
    max_history: Option<usize>,
}

impl InMemoryCheckpointSaver {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
            locks: ThreadLocks::new(),
            max_history: None,
        }
    }

    /// Keep at most `max` checkpoints per thread
    pub fn with_max_history(mut self, max: usize) -> Self {
        self.max_history = Some(max.max(1));
        self
    }

    pub async fn thread_count(&self) -> usize {
        self.storage.read().await.len()
    }

    pub async fn checkpoint_count(&self) -> usize {
        self.storage
            .read()
            .await
            .values()
            .map(|entries| entries.len())
            .sum()
    }

    pub async fn clear(&self) {
        self.storage.write().await.clear();
        self.locks.prune();
    }
}

impl Default for InMemoryCheckpointSaver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CheckpointSaver for InMemoryCheckpointSaver {
    async fn get_tuple(&self, config: &CheckpointConfig) -> Result<Option<CheckpointTuple>> {
        let thread_id = config.require_thread_id()?;
        let storage = self.storage.read().await;

        let Some(entries) = storage.get(thread_id) else {
            return Ok(None);
        };

        let found = match &config.checkpoint_id {
            Some(checkpoint_id) => entries.iter().find(|e| &e.checkpoint.id == checkpoint_id),
            None => entries.last(),
        };

        Ok(found.cloned())
    }

    async fn list(
        &self,
        config: &CheckpointConfig,
        limit: Option<usize>,
    ) -> Result<CheckpointStream> {
        let thread_id = config.require_thread_id()?;
        let storage = self.storage.read().await;

        let results: Vec<Result<CheckpointTuple>> = storage
            .get(thread_id)
            .map(|entries| {
                entries
                    .iter()
                    .rev()
                    .take(limit.unwrap_or(usize::MAX))
                    .cloned()
                    .map(Ok)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Box::pin(stream::iter(results)))
    }

    async fn put(
        &self,
        config: &CheckpointConfig,
        checkpoint: Checkpoint,
        metadata: CheckpointMetadata,
    ) -> Result<CheckpointConfig> {
        let thread_id = config.require_thread_id()?.to_string();

        let checkpoint_config = CheckpointConfig {
            thread_id: Some(thread_id.clone()),
            checkpoint_id: Some(checkpoint.id.clone()),
            extra: config.extra.clone(),
        };

        let mut storage = self.storage.write().await;
        let entries = storage.entry(thread_id).or_default();

        let parent_config = entries.last().map(|parent| parent.config.clone());
        entries.push(CheckpointTuple {
            config: checkpoint_config.clone(),
            checkpoint,
            metadata,
            parent_config,
        });

        if let Some(max) = self.max_history {
            if entries.len() > max {
                let excess = entries.len() - max;
                entries.drain(..excess);
            }
        }

        Ok(checkpoint_config)
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.storage.write().await.remove(thread_id);
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
    use futures::StreamExt;
    use serde_json::json;

    fn config(thread: &str) -> CheckpointConfig {
        CheckpointConfig::for_thread(thread)
    }

    #[tokio::test]
    async fn test_put_and_get_latest() {
        let saver = InMemoryCheckpointSaver::new();

        saver
            .put(&config("t1"), Checkpoint::new(json!({"n": 1}), 0), CheckpointMetadata::new())
            .await
            .unwrap();
        saver
            .put(&config("t1"), Checkpoint::new(json!({"n": 2}), 1), CheckpointMetadata::new())
            .await
            .unwrap();

        let latest = saver.get(&config("t1")).await.unwrap().unwrap();
        assert_eq!(latest.values, json!({"n": 2}));
        assert_eq!(saver.checkpoint_count().await, 2);
    }

    #[tokio::test]
    async fn test_get_specific_checkpoint_and_parent() {
        let saver = InMemoryCheckpointSaver::new();
        let first = saver
            .put(&config("t1"), Checkpoint::new(json!({"n": 1}), 0), CheckpointMetadata::new())
            .await
            .unwrap();
        saver
            .put(&config("t1"), Checkpoint::new(json!({"n": 2}), 1), CheckpointMetadata::new())
            .await
            .unwrap();

        let tuple = saver.get_tuple(&first).await.unwrap().unwrap();
        assert_eq!(tuple.checkpoint.values, json!({"n": 1}));

        let head = saver.get_tuple(&config("t1")).await.unwrap().unwrap();
        assert_eq!(head.parent_config, Some(first));
    }

    #[tokio::test]
    async fn test_threads_are_isolated() {
        let saver = InMemoryCheckpointSaver::new();
        saver
            .put(&config("a"), Checkpoint::new(json!("a"), 0), CheckpointMetadata::new())
            .await
            .unwrap();

        assert!(saver.get(&config("b")).await.unwrap().is_none());
        assert_eq!(saver.thread_count().await, 1);
    }

    #[tokio::test]
    async fn test_missing_thread_id_is_rejected() {
        let saver = InMemoryCheckpointSaver::new();
        let result = saver
            .put(&CheckpointConfig::new(), Checkpoint::new(json!({}), 0), CheckpointMetadata::new())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_list_newest_first_with_limit() {
        let saver = InMemoryCheckpointSaver::new();
        for step in 0..5 {
            saver
                .put(&config("t1"), Checkpoint::new(json!(step), step), CheckpointMetadata::new())
                .await
                .unwrap();
        }

        let steps: Vec<i32> = saver
            .list(&config("t1"), Some(3))
            .await
            .unwrap()
            .map(|t| t.unwrap().checkpoint.step)
            .collect()
            .await;

        assert_eq!(steps, vec![4, 3, 2]);
    }

    #[tokio::test]
    async fn test_max_history_keeps_newest() {
        let saver = InMemoryCheckpointSaver::new().with_max_history(2);
        for step in 0..4 {
            saver
                .put(&config("t1"), Checkpoint::new(json!(step), step), CheckpointMetadata::new())
                .await
                .unwrap();
        }

        assert_eq!(saver.checkpoint_count().await, 2);
        let head = saver.get(&config("t1")).await.unwrap().unwrap();
        assert_eq!(head.step, 3);
    }

    #[tokio::test]
    async fn test_delete_thread() {
        let saver = InMemoryCheckpointSaver::new();
        saver
            .put(&config("t1"), Checkpoint::new(json!({}), 0), CheckpointMetadata::new())
            .await
            .unwrap();

        saver.delete_thread("t1").await.unwrap();
        assert!(saver.get(&config("t1")).await.unwrap().is_none());
    }
}
