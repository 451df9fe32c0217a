//! Fallback fetch errors.

use http::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tower::BoxError;

/// Why a fallback payload could not be produced.
///
/// The `Display` text is sent to the client as the body of the
/// diagnostic response, so keep messages short and free of secrets.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no fallback target configured")]
    NotConfigured,

    #[error("invalid fallback request: {0}")]
    InvalidRequest(#[from] http::Error),

    #[error("{0}")]
    Transport(#[source] BoxError),

    #[error("fallback fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("fallback source answered {0}")]
    UnexpectedStatus(StatusCode),

    #[error("failed to read fallback body: {0}")]
    Body(#[source] BoxError),
}
