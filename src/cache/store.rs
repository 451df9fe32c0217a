//! Concurrent record store.

use dashmap::DashMap;
use std::sync::Arc;

use crate::cache::record::CacheRecord;

/// Key/record storage used by the fetcher.
///
/// Implementations only need to be safe for concurrent use; freshness is
/// the caller's concern.
pub trait CacheStore: Send + Sync {
    /// Current record for `key`, expired or not.
    fn load(&self, key: &str) -> Option<Arc<CacheRecord>>;

    /// Replace whatever is stored under `key`.
    fn store(&self, key: &str, record: Arc<CacheRecord>);
}

/// In-memory store backed by a `DashMap`. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryCacheStore {
    inner: Arc<DashMap<String, Arc<CacheRecord>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys ever stored.
    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl CacheStore for MemoryCacheStore {
    fn load(&self, key: &str) -> Option<Arc<CacheRecord>> {
        self.inner.get(key).map(|r| Arc::clone(r.value()))
    }

    fn store(&self, key: &str, record: Arc<CacheRecord>) {
        self.inner.insert(key.to_string(), record);
    }
}
