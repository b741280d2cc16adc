//! API error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hepflow_sinks::WriterError;
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced as HTTP status codes
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or wrong bearer token
    #[error("authentication required")]
    Unauthorized,

    /// Malformed or unsupported request parameters
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Backend failure while serving the request
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<WriterError> for ApiError {
    fn from(e: WriterError) -> Self {
        match e {
            WriterError::Unsupported => {
                Self::BadRequest("search is not supported by the configured writer".into())
            }
            WriterError::InvalidParams(msg) => Self::BadRequest(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// JSON body of an error response
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.code(),
            message: self.to_string(),
        };

        tracing::debug!(
            error_code = body.error,
            error_message = %body.message,
            status = %status,
            "API error response"
        );

        (status, Json(body)).into_response()
    }
}
