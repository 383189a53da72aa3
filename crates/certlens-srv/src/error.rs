//! Error types for the certlens HTTP backend.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use certlens::{ArchiveError, InspectError};
use thiserror::Error;

/// Errors that can occur in certlens-srv operations.
#[derive(Error, Debug)]
pub enum SrvError {
    /// Unix socket could not be prepared or bound.
    #[error("bind {path}: {source}")]
    Bind {
        path: String,
        source: std::io::Error,
    },

    /// The HTTP server stopped with an error.
    #[error("server error: {0}")]
    Serve(String),

    /// Configuration is invalid or unreadable.
    #[error("config error: {0}")]
    Config(String),

    /// Listing failed (only under the `abort` policy).
    #[error(transparent)]
    Inspect(#[from] InspectError),

    /// Archive build failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// A blocking task panicked or was cancelled.
    #[error("task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SrvError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Archive(ArchiveError::InvalidDomain(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Errors go back to the client as a bare JSON string.
impl IntoResponse for SrvError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.to_string())).into_response()
    }
}
