//! Fallback interception subsystem.
//!
//! # Data Flow
//! ```text
//! Request
//!     → service.rs (FallbackService::call)
//!         → disabled policy or no target: wrapped service answers directly
//!         → otherwise spawn wrapped service into recorder.rs
//!             race: handler completion vs upstream_timeout
//!         → policy.rs decides: trigger status / timeout / failure → fallback
//!             → Fetcher::fetch() → fallback status + payload
//!         → else: captured response copied to the client
//! ```
//!
//! # States
//! ```text
//! Pending → Completed | TimedOut | Failed → Decided → Responded
//! ```
//!
//! # Design Decisions
//! - Exactly one response per request; every path returns a single `Response`
//! - Completion is observed through the task's `JoinHandle`, never a shared flag
//! - Timed-out handlers are aborted unless `cancel_on_timeout` is off

pub mod policy;
pub mod recorder;
pub mod service;

pub use policy::TriggerPolicy;
pub use recorder::{CapturedResponse, RecordError, ResponseRecorder};
pub use service::{FallbackLayer, FallbackReason, FallbackService};
