//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the fallback proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The backend whose responses are guarded.
    pub upstream: UpstreamConfig,

    /// Fallback trigger and payload settings.
    pub fallback: FallbackConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Backend address (e.g., "127.0.0.1:3000").
    pub address: String,

    /// Outer limit for a whole request, fallback included, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Fallback settings, in their raw string form.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Comma-separated status codes that trigger the fallback (e.g., "500,502").
    /// Empty disables the fallback.
    pub fallback_on_status_codes: String,

    /// URL of the fallback payload. Empty disables the fallback.
    pub fallback_url: String,

    /// Status sent with the fallback payload. Empty means 200.
    pub fallback_status_code: String,

    /// Overrides the fetched payload's content type when non-empty.
    pub fallback_content_type: String,

    /// Deadline for the upstream and for the fallback fetch (e.g., "3s").
    pub upstream_timeout: String,

    /// How long a fetched payload is reused (e.g., "1m").
    pub cache_ttl: String,

    /// Abort upstream requests that miss the deadline instead of letting them finish.
    pub cancel_on_timeout: bool,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            fallback_on_status_codes: String::new(),
            fallback_url: String::new(),
            fallback_status_code: String::new(),
            fallback_content_type: String::new(),
            upstream_timeout: String::new(),
            cache_ttl: String::new(),
            cancel_on_timeout: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
