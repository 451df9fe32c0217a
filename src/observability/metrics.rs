//! Metrics collection and exposition.
//!
//! # Metrics
//! - `fallback_requests_total` (counter): requests by outcome
//!   (`passthrough`, `fallback`, `bypass`)
//! - `fallback_triggers_total` (counter): why a fallback was chosen
//!   (`status`, `timeout`, `handler_error`)
//! - `fallback_fetch_total` (counter): fetcher results
//!   (`hit`, `coalesced`, `miss`, `error`)
//! - `fallback_fetch_duration_seconds` (histogram): outbound fetch latency

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Start the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

pub fn record_request(outcome: &'static str) {
    metrics::counter!("fallback_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_trigger(reason: &'static str) {
    metrics::counter!("fallback_triggers_total", "reason" => reason).increment(1);
}

pub fn record_fetch(result: &'static str) {
    metrics::counter!("fallback_fetch_total", "result" => result).increment(1);
}

pub fn record_fetch_duration(start: Instant) {
    metrics::histogram!("fallback_fetch_duration_seconds").record(start.elapsed().as_secs_f64());
}
