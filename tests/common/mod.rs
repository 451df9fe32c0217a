//! Shared utilities for integration testing.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::http::StatusCode;
use bytes::Bytes;
use fallback_proxy::{CacheRecord, FetchError, Fetcher};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// What a mock backend writes back for one request.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: u16,
    pub body: String,
    pub content_type: Option<&'static str>,
}

impl MockReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: &'static str) -> Self {
        self.content_type = Some(content_type);
        self
    }
}

/// Start a mock backend that always answers with `reply`.
pub async fn start_mock_backend(reply: MockReply) -> SocketAddr {
    start_programmable_backend(move || {
        let reply = reply.clone();
        async move { reply }
    })
    .await
}

/// Start a programmable mock backend with async support.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MockReply> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            tokio::spawn(async move {
                read_request_head(&mut socket).await;
                let reply = f().await;
                let _ = socket.write_all(render(&reply).as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

async fn read_request_head(socket: &mut TcpStream) {
    let mut head = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => {
                head.extend_from_slice(&chunk[..n]);
                if head.windows(4).any(|w| w == b"\r\n\r\n") {
                    return;
                }
            }
        }
    }
}

fn render(reply: &MockReply) -> String {
    let reason = StatusCode::from_u16(reply.status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown");
    let content_type = reply
        .content_type
        .map(|ct| format!("Content-Type: {ct}\r\n"))
        .unwrap_or_default();
    format!(
        "HTTP/1.1 {} {}\r\n{}Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        reply.status,
        reason,
        content_type,
        reply.body.len(),
        reply.body
    )
}

/// Fetcher returning a canned payload or a canned error, counting calls.
pub struct ScriptedFetcher {
    enabled: bool,
    outcome: Result<(Bytes, String), String>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn ok(body: &'static str, content_type: &str) -> Arc<Self> {
        Arc::new(Self {
            enabled: true,
            outcome: Ok((Bytes::from_static(body.as_bytes()), content_type.to_string())),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            enabled: true,
            outcome: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    /// A fetcher without a target: the layer must bypass it.
    pub fn unconfigured() -> Arc<Self> {
        Arc::new(Self {
            enabled: false,
            outcome: Err("no fallback target configured".to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    fn can_fetch(&self) -> bool {
        self.enabled
    }

    async fn fetch(&self) -> Result<Arc<CacheRecord>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Ok((body, content_type)) => Ok(Arc::new(CacheRecord::new(
                body.clone(),
                content_type.clone(),
                Duration::from_secs(60),
            ))),
            Err(message) => Err(FetchError::Transport(message.clone().into())),
        }
    }
}
