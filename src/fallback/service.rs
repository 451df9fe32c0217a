//! Fallback layer and the per-request race.

use axum::body::Body;
use bytes::Bytes;
use http::{header, HeaderValue, Request, Response, StatusCode};
use http_body::Body as HttpBody;
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::task::JoinHandle;
use tower::{BoxError, Layer, Service, ServiceExt};

use crate::cache::CacheRecord;
use crate::fallback::policy::TriggerPolicy;
use crate::fallback::recorder::{CapturedResponse, ResponseRecorder};
use crate::fetch::Fetcher;
use crate::observability::metrics;

/// Tower layer that wraps a service with [`FallbackService`].
#[derive(Clone)]
pub struct FallbackLayer {
    policy: Arc<TriggerPolicy>,
    fetcher: Arc<dyn Fetcher>,
}

impl FallbackLayer {
    pub fn new(policy: TriggerPolicy, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            policy: Arc::new(policy),
            fetcher,
        }
    }
}

impl<S> Layer<S> for FallbackLayer {
    type Service = FallbackService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        FallbackService {
            inner,
            policy: Arc::clone(&self.policy),
            fetcher: Arc::clone(&self.fetcher),
        }
    }
}

/// Serves the wrapped service's response, or the fallback payload when the
/// wrapped service answers with a trigger status, fails, or runs out of time.
pub struct FallbackService<S> {
    inner: S,
    policy: Arc<TriggerPolicy>,
    fetcher: Arc<dyn Fetcher>,
}

impl<S: Clone> Clone for FallbackService<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            policy: Arc::clone(&self.policy),
            fetcher: Arc::clone(&self.fetcher),
        }
    }
}

impl<S, B> Service<Request<Body>> for FallbackService<S>
where
    S: Service<Request<Body>, Response = Response<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError> + Send,
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response<Body>, Infallible>> + Send>>;

    // Readiness of the inner service is driven by `oneshot` on a clone.
    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let inner = self.inner.clone();
        let policy = Arc::clone(&self.policy);
        let fetcher = Arc::clone(&self.fetcher);

        Box::pin(async move {
            if !fetcher.can_fetch() || !policy.is_enabled() {
                metrics::record_request("bypass");
                return Ok(bypass(inner, request).await);
            }

            let task = HandlerTask::spawn(inner, request, policy.cancel_on_timeout());
            let outcome = task.wait(policy.upstream_timeout()).await;

            let response = match decide(&policy, outcome) {
                Decision::PassThrough(captured) => {
                    tracing::debug!(status = ?captured.status, "Passing handler response through");
                    metrics::record_request("passthrough");
                    captured.into_response()
                }
                Decision::Fallback(reason) => {
                    tracing::debug!(reason = %reason, "Serving fallback");
                    metrics::record_trigger(reason.label());
                    metrics::record_request("fallback");
                    fallback_response(&policy, fetcher.as_ref()).await
                }
            };
            Ok(response)
        })
    }
}

/// No race, no buffering: the wrapped service answers the client directly.
async fn bypass<S, B>(inner: S, request: Request<Body>) -> Response<Body>
where
    S: Service<Request<Body>, Response = Response<B>>,
    S::Error: Into<BoxError>,
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    match inner.oneshot(request).await {
        Ok(response) => response.map(Body::new),
        Err(e) => {
            let e: BoxError = e.into();
            tracing::warn!(error = %e, "Wrapped service failed");
            let mut response = Response::new(Body::from("Upstream request failed"));
            *response.status_mut() = StatusCode::BAD_GATEWAY;
            response
        }
    }
}

/// How the race between the handler and the deadline ended.
#[derive(Debug)]
enum RaceOutcome {
    Completed(CapturedResponse),
    /// The handler errored, its body failed, or its task panicked. Logged in `wait`.
    Failed,
    TimedOut,
}

#[derive(Debug)]
enum Decision {
    PassThrough(CapturedResponse),
    Fallback(FallbackReason),
}

/// Why the fallback payload replaced the handler's response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// The handler answered with a trigger status.
    Status(StatusCode),
    /// The handler did not finish before the upstream timeout.
    Timeout,
    /// The handler failed without producing a response.
    HandlerError,
}

impl FallbackReason {
    pub fn label(&self) -> &'static str {
        match self {
            FallbackReason::Status(_) => "status",
            FallbackReason::Timeout => "timeout",
            FallbackReason::HandlerError => "handler_error",
        }
    }
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackReason::Status(status) => write!(f, "trigger status {}", status.as_u16()),
            FallbackReason::Timeout => write!(f, "timeout"),
            FallbackReason::HandlerError => write!(f, "handler error"),
        }
    }
}

fn decide(policy: &TriggerPolicy, outcome: RaceOutcome) -> Decision {
    match outcome {
        RaceOutcome::TimedOut => Decision::Fallback(FallbackReason::Timeout),
        RaceOutcome::Failed => Decision::Fallback(FallbackReason::HandlerError),
        RaceOutcome::Completed(captured) => match captured.status {
            Some(status) if policy.is_trigger(status) => {
                Decision::Fallback(FallbackReason::Status(status))
            }
            _ => Decision::PassThrough(captured),
        },
    }
}

/// The wrapped handler running on its own task, writing into a recorder.
///
/// Dropping it aborts the task when `cancel` is set; otherwise the task is
/// detached and runs to completion with nobody reading its output.
struct HandlerTask {
    handle: JoinHandle<Result<CapturedResponse, BoxError>>,
    cancel: bool,
}

impl HandlerTask {
    fn spawn<S, B>(inner: S, request: Request<Body>, cancel: bool) -> Self
    where
        S: Service<Request<Body>, Response = Response<B>> + Send + 'static,
        S::Future: Send + 'static,
        S::Error: Into<BoxError> + Send,
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let handle = tokio::spawn(run_handler(inner, request));
        Self { handle, cancel }
    }

    async fn wait(mut self, deadline: Duration) -> RaceOutcome {
        match tokio::time::timeout(deadline, &mut self.handle).await {
            Ok(Ok(Ok(captured))) => RaceOutcome::Completed(captured),
            Ok(Ok(Err(e))) => {
                tracing::warn!(error = %e, "Wrapped handler failed");
                RaceOutcome::Failed
            }
            Ok(Err(join_error)) => {
                tracing::warn!(error = %join_error, "Wrapped handler task did not complete");
                RaceOutcome::Failed
            }
            Err(_) => {
                if self.cancel {
                    tracing::debug!(timeout = ?deadline, "Wrapped handler timed out, cancelling");
                } else {
                    tracing::warn!(
                        timeout = ?deadline,
                        "Wrapped handler timed out, leaving it running in the background"
                    );
                }
                RaceOutcome::TimedOut
            }
        }
    }
}

async fn run_handler<S, B>(inner: S, request: Request<Body>) -> Result<CapturedResponse, BoxError>
where
    S: Service<Request<Body>, Response = Response<B>>,
    S::Error: Into<BoxError>,
    B: HttpBody<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let response = inner.oneshot(request).await.map_err(Into::<BoxError>::into)?;
    let mut recorder = ResponseRecorder::new();
    recorder.record(response).await?;
    Ok(recorder.finish())
}

impl Drop for HandlerTask {
    fn drop(&mut self) {
        if self.cancel {
            self.handle.abort();
        }
    }
}

/// Fetch the fallback payload and turn it into the client response.
///
/// A fetch error becomes `418` with the error text as body and no content type.
async fn fallback_response(policy: &TriggerPolicy, fetcher: &dyn Fetcher) -> Response<Body> {
    let record = match fetcher.fetch().await {
        Ok(record) => record,
        Err(e) => {
            let mut response = Response::new(Body::from(e.to_string()));
            *response.status_mut() = StatusCode::IM_A_TEAPOT;
            return response;
        }
    };

    let body = if record.body.is_empty() {
        Body::empty()
    } else {
        Body::from(record.body.clone())
    };

    let mut response = Response::new(body);
    *response.status_mut() = policy.fallback_status();
    if let Some(content_type) = fallback_content_type(policy, &record) {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, content_type);
    }
    response
}

/// Configured override, else the fetched type, else nothing.
fn fallback_content_type(policy: &TriggerPolicy, record: &CacheRecord) -> Option<HeaderValue> {
    if let Some(content_type) = policy.content_type() {
        return Some(content_type.clone());
    }
    if record.content_type.is_empty() {
        return None;
    }
    match HeaderValue::from_str(&record.content_type) {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::debug!(
                content_type = %record.content_type,
                "Dropping invalid fetched content type"
            );
            None
        }
    }
}
