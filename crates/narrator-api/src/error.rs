//! Narrator API — error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use narrator_core::error::NarratorError;
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `NarratorError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub NarratorError);

impl From<NarratorError> for ApiError {
    fn from(err: NarratorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            NarratorError::Unauthorized => (StatusCode::FORBIDDEN, "unauthorized"),
            NarratorError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            NarratorError::Persistence(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "persistence_error")
            }
            NarratorError::ChannelClosed(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "controller_unavailable")
            }
        };

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: NarratorError) -> StatusCode {
        let response = ApiError(err).into_response();
        response.status()
    }

    #[test]
    fn test_unauthorized_maps_to_403() {
        assert_eq!(status_of(NarratorError::Unauthorized), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_validation_maps_to_400() {
        assert_eq!(
            status_of(NarratorError::Validation("empty message".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_persistence_maps_to_500() {
        assert_eq!(
            status_of(NarratorError::Persistence("disk full".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_channel_closed_maps_to_500() {
        assert_eq!(
            status_of(NarratorError::ChannelClosed("controller runtime")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
