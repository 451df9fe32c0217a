//! Cached fallback payload.

use bytes::Bytes;
use std::time::Duration;
use tokio::time::Instant;

/// A fetched fallback payload and its expiry instant.
///
/// Never mutated after being stored: a refresh stores a new record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord {
    /// Response body, possibly empty.
    pub body: Bytes,
    /// `Content-Type` of the fetched response; empty when unknown.
    pub content_type: String,
    /// Instant after which the record is stale.
    pub expires_at: Instant,
}

impl CacheRecord {
    /// Build a record that stays fresh for `ttl` from now.
    pub fn new(body: Bytes, content_type: impl Into<String>, ttl: Duration) -> Self {
        Self {
            body,
            content_type: content_type.into(),
            expires_at: Instant::now() + ttl,
        }
    }

    /// True once the current time is past `expires_at`.
    pub fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}
