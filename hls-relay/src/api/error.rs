//! API error handling.
//!
//! Relay failures are answered with HTTP 200 and an `{ "error": ... }` body, so
//! players and browsers can read the message without special status handling.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use relay_engine::RelayError;

use crate::api::models::ErrorResponse;

/// API error type that can be converted to HTTP responses.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Create an error reported in-band with a 200 status.
    pub fn in_band(message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        match &err {
            RelayError::Io { .. } | RelayError::Configuration { .. } => {
                tracing::error!(error = %err, "Relay failed");
            }
            _ => tracing::debug!(error = %err, "Relay request rejected"),
        }
        ApiError::in_band(err.public_message())
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;
