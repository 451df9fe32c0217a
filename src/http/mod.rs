//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tower-http trace / request id / timeout)
//!     → FallbackLayer (race + decision)
//!     → proxy_handler (forward to the upstream backend)
//!     → Send to client
//! ```

pub mod server;

pub use server::HttpServer;
