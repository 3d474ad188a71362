//! Error types for the API layer.
//!
//! [`ApiError`] unifies all failure modes into a single enum that can be
//! converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use presence_db::DbError;

/// Errors that can occur while handling a request.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A request parameter was missing or malformed.
    ///
    /// Rendered as a bare `400` with no body.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The storage layer failed or timed out.
    #[error("storage error: {0}")]
    Storage(#[from] DbError),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::InvalidParameter(msg) => {
                tracing::debug!(reason = %msg, "Rejected request parameters");
                return StatusCode::BAD_REQUEST.into_response();
            }
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Storage(e) => {
                tracing::error!(error = %e, "Storage failure while handling request");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("storage error: {e}"))
            }
            Self::Serialization(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("JSON error: {e}"))
            }
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
