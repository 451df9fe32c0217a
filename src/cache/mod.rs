//! Fallback payload cache subsystem.
//!
//! # Data Flow
//! ```text
//! HttpFetcher::fetch(key)
//!     → store.rs (lock-free load; fresh record returned immediately)
//!     → lock.rs (per-key exclusion, one outbound fetch per key at a time)
//!     → store.rs (re-check under the lock, then replace with new record)
//! ```
//!
//! # Design Decisions
//! - Expiry is evaluated by callers via `CacheRecord::is_expired`; the store never sweeps
//! - Records are immutable once stored and shared through `Arc`
//! - Stores and lock registries are instance-owned handles, cloned into each fetcher
//! - No eviction: keys are operator-configured fallback URLs, not request-derived

pub mod lock;
pub mod record;
pub mod store;

pub use lock::{KeyLockGuard, KeyedLocks};
pub use record::CacheRecord;
pub use store::{CacheStore, MemoryCacheStore};
