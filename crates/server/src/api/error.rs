//! Mapping of queue errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use pila_core::QueueError;

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: &'static str,
}

/// Error returned by API handlers.
#[derive(Debug)]
pub enum ApiError {
    Queue(QueueError),
    /// Malformed query parameters the extractors do not catch.
    BadRequest(String),
    /// The caller's role may not act on the requested step.
    Forbidden(String),
}

impl From<QueueError> for ApiError {
    fn from(e: QueueError) -> Self {
        ApiError::Queue(e)
    }
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Queue(e) => {
                let status = match e {
                    QueueError::Validation(_) => StatusCode::BAD_REQUEST,
                    QueueError::NotFound(_) => StatusCode::NOT_FOUND,
                    QueueError::Precondition(_) => StatusCode::CONFLICT,
                    QueueError::Conflict { .. } => StatusCode::SERVICE_UNAVAILABLE,
                    QueueError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.kind())
            }
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "validation"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Queue(e) => write!(f, "{}", e),
            ApiError::BadRequest(msg) | ApiError::Forbidden(msg) => f.write_str(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {}", self);
        }

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
                kind,
            }),
        )
            .into_response()
    }
}
