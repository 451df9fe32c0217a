//! In-memory response capture.
//!
//! The wrapped handler's output lands here first so the orchestrator can
//! look at it before anything reaches the client.

use axum::body::Body;
use bytes::{Bytes, BytesMut};
use http::{HeaderMap, Response, StatusCode};
use http_body::Body as HttpBody;
use http_body_util::BodyExt;
use std::pin::pin;
use thiserror::Error;
use tower::BoxError;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("failed to read handler response body: {0}")]
    Body(#[source] BoxError),
}

/// Buffering response sink. Never touches a network connection.
#[derive(Debug, Default)]
pub struct ResponseRecorder {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
}

impl ResponseRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Set the status code. The last call wins.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    /// `None` until the handler sets a status.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Append to the captured body.
    pub fn write(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
    }

    /// Capture a complete service response: status, headers, then every data frame.
    ///
    /// Trailers are dropped. Whatever was written before a body error stays recorded.
    pub async fn record<B>(&mut self, response: Response<B>) -> Result<(), RecordError>
    where
        B: HttpBody<Data = Bytes>,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = response.into_parts();
        self.set_status(parts.status);
        for (name, value) in parts.headers.iter() {
            self.headers.append(name.clone(), value.clone());
        }

        let mut body = pin!(body);
        while let Some(frame) = body.frame().await {
            let frame = frame.map_err(|e| RecordError::Body(e.into()))?;
            if let Some(data) = frame.data_ref() {
                self.write(data);
            }
        }
        Ok(())
    }

    /// Freeze what was captured.
    pub fn finish(self) -> CapturedResponse {
        CapturedResponse {
            status: self.status,
            headers: self.headers,
            body: self.body.freeze(),
        }
    }
}

/// Snapshot of a recorder, read once by the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct CapturedResponse {
    pub status: Option<StatusCode>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CapturedResponse {
    /// Replay onto a real response: headers, status, then body.
    ///
    /// A handler that never set a status gets `200 OK`, as an HTTP server would send.
    pub fn into_response(self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.body));
        *response.headers_mut() = self.headers;
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header;

    #[test]
    fn test_recorder_defaults_to_no_status() {
        let rec = ResponseRecorder::new();
        assert_eq!(rec.status(), None);
        assert!(rec.headers().is_empty());

        let captured = rec.finish();
        assert!(captured.status.is_none());
        assert!(captured.body.is_empty());
    }

    #[test]
    fn test_last_status_wins_and_body_appends() {
        let mut rec = ResponseRecorder::new();
        rec.set_status(StatusCode::CREATED);
        rec.set_status(StatusCode::ACCEPTED);
        rec.headers_mut()
            .insert(header::CONTENT_TYPE, "text/plain".parse().unwrap());
        rec.write(b"hello ");
        rec.write(b"world");

        let captured = rec.finish();
        assert_eq!(captured.status, Some(StatusCode::ACCEPTED));
        assert_eq!(captured.body, Bytes::from_static(b"hello world"));
        assert_eq!(captured.headers[header::CONTENT_TYPE], "text/plain");
    }

    #[tokio::test]
    async fn test_record_service_response() {
        let response = Response::builder()
            .status(StatusCode::BAD_GATEWAY)
            .header("x-trace", "a")
            .header("x-trace", "b")
            .body(Body::from("upstream down"))
            .unwrap();

        let mut rec = ResponseRecorder::new();
        rec.record(response).await.unwrap();
        let captured = rec.finish();

        assert_eq!(captured.status, Some(StatusCode::BAD_GATEWAY));
        assert_eq!(captured.headers.get_all("x-trace").iter().count(), 2);
        assert_eq!(captured.body, Bytes::from_static(b"upstream down"));
    }

    #[tokio::test]
    async fn test_replay_without_status_is_ok() {
        let mut rec = ResponseRecorder::new();
        rec.write(b"implicit");

        let response = rec.finish().into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from_static(b"implicit"));
    }
}
