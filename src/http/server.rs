//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the upstream proxy handler
//! - Wrap it with the fallback layer built from config
//! - Wire up middleware (tracing, request ID, outer timeout)
//! - Serve until the shutdown signal fires

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, PathAndQuery, Scheme},
        HeaderValue, Request, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::cache::{KeyedLocks, MemoryCacheStore};
use crate::config::validation::build_policy;
use crate::config::{ConfigError, ProxyConfig, ValidationError};
use crate::fallback::{FallbackLayer, TriggerPolicy};
use crate::fetch::{Fetcher, HttpFetcher, HyperTransport};

/// Application state injected into the proxy handler.
#[derive(Clone)]
pub struct AppState {
    pub client: Client<HttpConnector, Body>,
    pub upstream: Authority,
}

/// HTTP server guarding one upstream with a fallback payload.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
}

impl HttpServer {
    /// Create a server that fetches the fallback over HTTP or HTTPS.
    pub fn new(config: ProxyConfig) -> Result<Self, ConfigError> {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let policy = build_policy(&config.fallback).map_err(ConfigError::Validation)?;

        let fetcher = HttpFetcher::new(
            Arc::new(HyperTransport::new()),
            Arc::new(MemoryCacheStore::new()),
            KeyedLocks::new(),
            config.fallback.fallback_url.clone(),
            policy.cache_ttl(),
            policy.upstream_timeout(),
        );

        Self::build(config, client, policy, Arc::new(fetcher))
    }

    /// Create a server with a caller-supplied fallback source.
    pub fn with_fetcher(
        config: ProxyConfig,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, ConfigError> {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let policy = build_policy(&config.fallback).map_err(ConfigError::Validation)?;
        Self::build(config, client, policy, fetcher)
    }

    fn build(
        config: ProxyConfig,
        client: Client<HttpConnector, Body>,
        policy: TriggerPolicy,
        fetcher: Arc<dyn Fetcher>,
    ) -> Result<Self, ConfigError> {
        let upstream = config.upstream.address.parse::<Authority>().map_err(|_| {
            ConfigError::Validation(vec![ValidationError::InvalidAddress {
                field: "upstream.address",
                value: config.upstream.address.clone(),
            }])
        })?;

        tracing::info!(
            upstream = %upstream,
            fallback_url = %config.fallback.fallback_url,
            trigger_codes = ?policy.trigger_codes(),
            timeout = ?policy.upstream_timeout(),
            ttl = ?policy.cache_ttl(),
            enabled = fetcher.can_fetch() && policy.is_enabled(),
            "Fallback policy loaded"
        );

        let state = AppState { client, upstream };
        let router = Self::build_router(&config, state, FallbackLayer::new(policy, fetcher));
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState, fallback: FallbackLayer) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(fallback)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.upstream.request_timeout_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server, accepting connections until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// The fully layered router, for embedding or in-process tests.
    pub fn into_router(self) -> Router {
        self.router
    }
}

/// Request IDs as UUID v4 in `x-request-id`.
#[derive(Clone, Copy, Default)]
struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Forward the request to the upstream backend unchanged.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (mut parts, body) = request.into_parts();

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(state.upstream.clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to build upstream URI");
            return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
        }
    };

    tracing::debug!(method = %parts.method, uri = %parts.uri, "Proxying request");

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => response.map(Body::new),
        Err(e) => {
            tracing::warn!(upstream = %state.upstream, error = %e, "Upstream error");
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}
