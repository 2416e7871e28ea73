//! Error types for gdp-player
//!
//! `Error` is what the player's internals return; `ApiError` is what HTTP
//! handlers return and knows how to render itself as a JSON response.

use crate::archive::ArchiveError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for gdp-player
#[derive(Error, Debug)]
pub enum Error {
    /// Archive API errors (search, metadata, download)
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Audio decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation not allowed in the current playback state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Invalid request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// gdp-common error
    #[error(transparent)]
    Common(#[from] gdp_common::Error),
}

/// Convenience Result type using gdp-player Error
pub type Result<T> = std::result::Result<T, Error>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409) - a playback session is already running
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::InvalidState(msg) => ApiError::Conflict(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = std::result::Result<T, ApiError>;
