//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! FallbackService / HttpFetcher produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (fmt subscriber, filtered by RUST_LOG or config)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Structured fields (key, status, reason) instead of formatted strings
//! - Metric updates are no-ops until a recorder is installed, so the
//!   library can be embedded without the exporter

pub mod logging;
pub mod metrics;
