//! Per-thread async locks
//!
//! A turn or a resume holds its thread's lock from the moment it reads the head checkpoint
//! until its last write, so two requests on the same thread never interleave. Different
//! threads lock independently.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Held while a thread is being executed. Dropping it releases the thread.
#[derive(Debug)]
pub struct ThreadGuard {
    thread_id: String,
    _guard: OwnedMutexGuard<()>,
}

impl ThreadGuard {
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }
}

/// Registry of one async mutex per thread id
#[derive(Debug, Clone, Default)]
pub struct ThreadLocks {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl ThreadLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `thread_id` is free and take it
    pub async fn acquire(&self, thread_id: &str) -> ThreadGuard {
        let lock = {
            let mut locks = self.locks.lock();
            locks
                .entry(thread_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        ThreadGuard {
            thread_id: thread_id.to_string(),
            _guard: lock.lock_owned().await,
        }
    }

    /// Drop lock entries nobody holds or waits on
    pub fn prune(&self) {
        self.locks
            .lock()
            .retain(|_, lock| Arc::strong_count(lock) > 1 || lock.try_lock().is_err());
    }

    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_thread_is_serialized() {
        let locks = ThreadLocks::new();
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let locks = locks.clone();
            let active = active.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("thread-1").await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_threads_do_not_block() {
        let locks = ThreadLocks::new();
        let _a = locks.acquire("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_prune_keeps_held_locks() {
        let locks = ThreadLocks::new();
        let held = locks.acquire("held").await;
        drop(locks.acquire("released").await);

        locks.prune();
        assert_eq!(locks.len(), 1);
        assert_eq!(held.thread_id(), "held");
    }
}
