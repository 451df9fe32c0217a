//! Fallback fetch subsystem.
//!
//! # Data Flow
//! ```text
//! FallbackService (decided to fall back)
//!     → Fetcher::fetch()
//!         → cache hit: return stored record
//!         → cache miss: per-key lock → re-check → transport.rs GET target
//!             → store new record with expiry = now + ttl
//! ```
//!
//! # Design Decisions
//! - Double-checked single-flight: at most one outbound fetch per key at a time
//! - Failures are never cached and never retried; the previous record stays usable
//! - Fetch deadline is independent of the handler race deadline
//! - Transport is a trait so tests run without a network

pub mod error;
pub mod fetcher;
pub mod transport;

use async_trait::async_trait;
use std::sync::Arc;

use crate::cache::CacheRecord;

pub use self::error::FetchError;
pub use self::fetcher::HttpFetcher;
pub use self::transport::{HyperTransport, Transport};

/// Source of the fallback payload.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Whether a fallback target is configured at all.
    fn can_fetch(&self) -> bool;

    /// Return a fresh (possibly cached) fallback record.
    async fn fetch(&self) -> Result<Arc<CacheRecord>, FetchError>;
}
