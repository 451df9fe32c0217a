//! HTTP fallback middleware library.
//!
//! Wraps a tower service and replaces its response with a cached fallback
//! payload when the service answers with a configured status code, fails,
//! or does not finish in time.

pub mod cache;
pub mod config;
pub mod fallback;
pub mod fetch;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use cache::{CacheRecord, CacheStore, KeyedLocks, MemoryCacheStore};
pub use config::schema::ProxyConfig;
pub use fallback::{FallbackLayer, FallbackService, TriggerPolicy};
pub use fetch::{FetchError, Fetcher, HttpFetcher, HyperTransport, Transport};
pub use crate::http::HttpServer;
pub use lifecycle::Shutdown;
