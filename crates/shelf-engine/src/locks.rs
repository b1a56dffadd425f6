//! # Keyed Locks
//!
//! One async mutex per key (product ID, order ID), created on demand and
//! dropped once nobody holds or waits on it.
//!
//! ```text
//! record_out(p-1) ──► lock("p-1") ──► tx ──► unlock
//! record_out(p-1) ──────────────► waits ───────────► lock("p-1") ...
//! record_out(p-2) ──► lock("p-2") ──► tx ──► unlock      (independent)
//! ```
//!
//! The database write is already conditional; the lock keeps same-key
//! callers in this process from racing for the SQLite write lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Map size above which dead entries are pruned on the next lock call.
const PRUNE_THRESHOLD: usize = 256;

/// A set of async mutexes addressed by string key.
#[derive(Debug, Clone, Default)]
pub struct KeyedLocks {
    inner: Arc<Mutex<HashMap<String, Weak<AsyncMutex<()>>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

            if map.len() > PRUNE_THRESHOLD {
                map.retain(|_, weak| weak.strong_count() > 0);
            }

            match map.get(key).and_then(Weak::upgrade) {
                Some(existing) => existing,
                None => {
                    let created = Arc::new(AsyncMutex::new(()));
                    map.insert(key.to_string(), Arc::downgrade(&created));
                    created
                }
            }
        };

        mutex.lock_owned().await
    }

    /// Number of keys currently tracked (live or not yet pruned).
    pub fn tracked(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = KeyedLocks::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            let max_seen = max_seen.clone();
            tasks.push(tokio::spawn(async move {
                let _guard = locks.lock("p-1").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.lock("p-1").await;

        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock("p-2")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_released_locks_are_reused_not_leaked() {
        let locks = KeyedLocks::new();
        drop(locks.lock("p-1").await);
        drop(locks.lock("p-1").await);
        assert_eq!(locks.tracked(), 1);
    }
}
