//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Turn raw fallback strings into a typed `TriggerPolicy`
//! - Validate value ranges (status codes, durations, addresses, URLs)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use http::uri::Authority;
use http::{HeaderValue, StatusCode};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::config::schema::{FallbackConfig, ProxyConfig};
use crate::fallback::TriggerPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid status code: {0}")]
    InvalidStatusCode(String),

    #[error("invalid fallback status code: {0}")]
    InvalidFallbackStatusCode(String),

    #[error("invalid fallback content type: {0}")]
    InvalidContentType(String),

    #[error("invalid duration for {field}: {value}")]
    InvalidDuration { field: &'static str, value: String },

    #[error("invalid fallback url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid socket address for {field}: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

/// Check the whole configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = match build_policy(&config.fallback) {
        Ok(_) => Vec::new(),
        Err(errors) => errors,
    };

    if let Err(e) = validate_fallback_url(&config.fallback.fallback_url) {
        errors.push(e);
    }
    check_address("listener.bind_address", &config.listener.bind_address, &mut errors);
    if config.upstream.address.parse::<Authority>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "upstream.address",
            value: config.upstream.address.clone(),
        });
    }
    if config.upstream.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "upstream.request_timeout_secs",
        });
    }
    if config.observability.metrics_enabled {
        check_address(
            "observability.metrics_address",
            &config.observability.metrics_address,
            &mut errors,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Build the trigger policy from raw fallback settings.
pub fn build_policy(config: &FallbackConfig) -> Result<TriggerPolicy, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let codes = parse_status_codes(&config.fallback_on_status_codes).unwrap_or_else(|mut e| {
        errors.append(&mut e);
        Vec::new()
    });

    let fallback_status = match config.fallback_status_code.trim() {
        "" => StatusCode::OK,
        raw => parse_status(raw).unwrap_or_else(|| {
            errors.push(ValidationError::InvalidFallbackStatusCode(raw.to_string()));
            StatusCode::OK
        }),
    };

    let content_type = match config.fallback_content_type.trim() {
        "" => None,
        raw => match HeaderValue::from_str(raw) {
            Ok(value) => Some(value),
            Err(_) => {
                errors.push(ValidationError::InvalidContentType(raw.to_string()));
                None
            }
        },
    };

    let upstream_timeout = parse_duration("upstream_timeout", &config.upstream_timeout)
        .unwrap_or_else(|e| {
            errors.push(e);
            Duration::ZERO
        });
    let cache_ttl = parse_duration("cache_ttl", &config.cache_ttl).unwrap_or_else(|e| {
        errors.push(e);
        Duration::ZERO
    });

    if !errors.is_empty() {
        return Err(errors);
    }

    let mut policy = TriggerPolicy::new(codes, fallback_status)
        .with_upstream_timeout(upstream_timeout)
        .with_cache_ttl(cache_ttl)
        .with_cancel_on_timeout(config.cancel_on_timeout);
    if let Some(content_type) = content_type {
        policy = policy.with_content_type(content_type);
    }
    Ok(policy)
}

/// Parse a comma-separated status code list. Empty input is an empty list.
pub fn parse_status_codes(raw: &str) -> Result<Vec<StatusCode>, Vec<ValidationError>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut codes = Vec::new();
    let mut errors = Vec::new();
    for entry in raw.split(',').map(str::trim) {
        match parse_status(entry) {
            Some(code) => codes.push(code),
            None => errors.push(ValidationError::InvalidStatusCode(entry.to_string())),
        }
    }

    if errors.is_empty() {
        Ok(codes)
    } else {
        Err(errors)
    }
}

fn parse_status(raw: &str) -> Option<StatusCode> {
    raw.parse::<u16>()
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
}

/// Empty input parses to zero, which the policy replaces with its default.
fn parse_duration(field: &'static str, raw: &str) -> Result<Duration, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Duration::ZERO);
    }
    humantime::parse_duration(raw).map_err(|_| ValidationError::InvalidDuration {
        field,
        value: raw.to_string(),
    })
}

fn validate_fallback_url(raw: &str) -> Result<(), ValidationError> {
    if raw.is_empty() {
        return Ok(());
    }
    let invalid = |reason: String| ValidationError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme {other}"))),
    }
}

fn check_address(field: &'static str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
