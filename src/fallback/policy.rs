//! Fallback trigger policy.

use http::{HeaderValue, StatusCode};
use std::collections::HashSet;
use std::time::Duration;

/// When to replace the wrapped handler's response, and with what status.
///
/// Built once at startup and shared read-only by every request.
#[derive(Debug, Clone)]
pub struct TriggerPolicy {
    trigger_codes: HashSet<StatusCode>,
    fallback_status: StatusCode,
    content_type: Option<HeaderValue>,
    upstream_timeout: Duration,
    cache_ttl: Duration,
    cancel_on_timeout: bool,
}

impl TriggerPolicy {
    pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(3);
    pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

    pub fn new(
        trigger_codes: impl IntoIterator<Item = StatusCode>,
        fallback_status: StatusCode,
    ) -> Self {
        Self {
            trigger_codes: trigger_codes.into_iter().collect(),
            fallback_status,
            content_type: None,
            upstream_timeout: Self::DEFAULT_UPSTREAM_TIMEOUT,
            cache_ttl: Self::DEFAULT_CACHE_TTL,
            cancel_on_timeout: true,
        }
    }

    /// Content type that overrides whatever the fallback source returned.
    pub fn with_content_type(mut self, content_type: HeaderValue) -> Self {
        self.content_type = Some(content_type);
        self
    }

    /// Zero keeps the default.
    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.upstream_timeout = timeout;
        }
        self
    }

    /// Zero keeps the default.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        if !ttl.is_zero() {
            self.cache_ttl = ttl;
        }
        self
    }

    /// Leave timed-out handlers running in the background instead of aborting them.
    pub fn with_cancel_on_timeout(mut self, cancel: bool) -> Self {
        self.cancel_on_timeout = cancel;
        self
    }

    /// False when no trigger codes are configured.
    pub fn is_enabled(&self) -> bool {
        !self.trigger_codes.is_empty()
    }

    pub fn is_trigger(&self, status: StatusCode) -> bool {
        self.trigger_codes.contains(&status)
    }

    pub fn trigger_codes(&self) -> &HashSet<StatusCode> {
        &self.trigger_codes
    }

    pub fn fallback_status(&self) -> StatusCode {
        self.fallback_status
    }

    pub fn content_type(&self) -> Option<&HeaderValue> {
        self.content_type.as_ref()
    }

    pub fn upstream_timeout(&self) -> Duration {
        self.upstream_timeout
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    pub fn cancel_on_timeout(&self) -> bool {
        self.cancel_on_timeout
    }
}
