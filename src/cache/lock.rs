//! Per-key mutual exclusion.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of async mutexes keyed by an opaque string.
///
/// Mutexes are created lazily on first use. Creation goes through
/// `DashMap::entry`, so two tasks locking a fresh key at the same time
/// always receive the same mutex. Locks for different keys never contend.
#[derive(Clone, Default)]
pub struct KeyedLocks {
    inner: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other task holds `key`, then take it.
    ///
    /// The lock is released when the returned guard is dropped, on every
    /// exit path of the guarded section.
    pub async fn lock(&self, key: &str) -> KeyLockGuard {
        // Clone the Arc out so the shard guard is not held across the await.
        let mutex = self
            .inner
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();

        KeyLockGuard {
            _guard: mutex.lock_owned().await,
        }
    }

    /// Number of keys that have ever been locked.
    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.len()
    }
}

/// Held lock for a single key. Dropping it unlocks the key.
#[derive(Debug)]
pub struct KeyLockGuard {
    _guard: OwnedMutexGuard<()>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_same_key_is_exclusive() {
        let locks = KeyedLocks::new();
        let guard = locks.lock("http://a").await;

        let contender = locks.clone();
        let mut waiter = tokio::spawn(async move {
            let _g = contender.lock("http://a").await;
        });

        // Still blocked while the first guard is alive.
        assert!(tokio::time::timeout(Duration::from_millis(50), &mut waiter)
            .await
            .is_err());

        drop(guard);
        tokio::time::timeout(Duration::from_millis(50), waiter)
            .await
            .expect("waiter should acquire after release")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_distinct_keys_do_not_contend() {
        let locks = KeyedLocks::new();
        let _a = locks.lock("http://a").await;

        let b = tokio::time::timeout(Duration::from_millis(10), locks.lock("http://b")).await;
        assert!(b.is_ok(), "lock on another key must not block");
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_first_use_shares_one_mutex() {
        let locks = KeyedLocks::new();
        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..16 {
            let locks = locks.clone();
            tasks.spawn(async move {
                let _g = locks.lock("http://shared").await;
            });
        }
        while let Some(res) = tasks.join_next().await {
            res.unwrap();
        }
        assert_eq!(locks.len(), 1);
    }
}
