//! Single-flight fallback fetcher.

use async_trait::async_trait;
use axum::body::Body;
use bytes::Bytes;
use http::{header, Method, Request, Response};
use http_body::Body as HttpBody;
use http_body_util::BodyExt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::{CacheRecord, CacheStore, KeyedLocks};
use crate::fetch::{FetchError, Fetcher, Transport};
use crate::observability::metrics;

const USER_AGENT: &str = concat!("fallback-proxy/", env!("CARGO_PKG_VERSION"));

/// Fetches the fallback payload over HTTP and caches it per target URL.
///
/// The target URL is both the cache key and the lock key, so fetchers that
/// share a store and lock registry also share single-flight for the same URL.
pub struct HttpFetcher {
    target_url: String,
    cache_ttl: Duration,
    timeout: Duration,
    transport: Arc<dyn Transport>,
    cache: Arc<dyn CacheStore>,
    locks: KeyedLocks,
}

impl HttpFetcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        cache: Arc<dyn CacheStore>,
        locks: KeyedLocks,
        target_url: impl Into<String>,
        cache_ttl: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            target_url: target_url.into(),
            cache_ttl,
            timeout,
            transport,
            cache,
            locks,
        }
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    fn fresh(&self) -> Option<Arc<CacheRecord>> {
        self.cache
            .load(&self.target_url)
            .filter(|rec| !rec.is_expired())
    }

    /// One GET against the target, body included. Caller holds the key lock.
    async fn download(&self) -> Result<CacheRecord, FetchError> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(self.target_url.as_str())
            .header(header::USER_AGENT, USER_AGENT)
            .body(Body::empty())?;

        let response = self
            .transport
            .send(request)
            .await
            .map_err(FetchError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::UnexpectedStatus(status));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let body = if content_length(&response) > 0 {
            response
                .into_body()
                .collect()
                .await
                .map_err(|e| FetchError::Body(e.into()))?
                .to_bytes()
        } else {
            Bytes::new()
        };

        Ok(CacheRecord::new(body, content_type, self.cache_ttl))
    }
}

/// Declared body length: `Content-Length`, else an exact size hint, else 0.
fn content_length(response: &Response<Body>) -> u64 {
    response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .or_else(|| response.body().size_hint().exact())
        .unwrap_or(0)
}

#[async_trait]
impl Fetcher for HttpFetcher {
    fn can_fetch(&self) -> bool {
        !self.target_url.is_empty()
    }

    async fn fetch(&self) -> Result<Arc<CacheRecord>, FetchError> {
        if !self.can_fetch() {
            return Err(FetchError::NotConfigured);
        }

        if let Some(rec) = self.fresh() {
            metrics::record_fetch("hit");
            return Ok(rec);
        }

        let _guard = self.locks.lock(&self.target_url).await;

        // Someone else may have refreshed while we waited.
        if let Some(rec) = self.fresh() {
            tracing::debug!(key = %self.target_url, "Fallback refreshed by concurrent fetch");
            metrics::record_fetch("coalesced");
            return Ok(rec);
        }

        let start = Instant::now();
        let result = match tokio::time::timeout(self.timeout, self.download()).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(self.timeout)),
        };
        metrics::record_fetch_duration(start);

        match result {
            Ok(record) => {
                let record = Arc::new(record);
                self.cache.store(&self.target_url, Arc::clone(&record));
                metrics::record_fetch("miss");
                tracing::info!(
                    key = %self.target_url,
                    bytes = record.body.len(),
                    content_type = %record.content_type,
                    elapsed = ?start.elapsed(),
                    "Fallback payload refreshed"
                );
                Ok(record)
            }
            Err(e) => {
                metrics::record_fetch("error");
                tracing::warn!(key = %self.target_url, error = %e, "Fallback fetch failed");
                Err(e)
            }
        }
    }
}
