//! HTTP error mapping.
//!
//! Every failure leaves the server as `{"error": kind, "message": text}`.

use crate::error::KanbanError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    /// Entity validation failed (400)
    Validation(String),

    /// Resource not found (404)
    NotFound { resource: &'static str, id: String },

    /// Malformed request body (400)
    BadRequest(String),

    /// Storage or IO failure (500, logged)
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Validation(message) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "validation_error",
                    "message": message
                }),
            ),
            Self::NotFound { resource, id } => (
                StatusCode::NOT_FOUND,
                json!({
                    "error": "not_found",
                    "message": format!("{resource} {id} not found")
                }),
            ),
            Self::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "bad_request",
                    "message": message
                }),
            ),
            Self::Internal(message) => {
                // Detail stays in the log
                tracing::error!("Internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": "internal_error",
                        "message": "an internal error occurred"
                    }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<KanbanError> for ApiError {
    fn from(err: KanbanError) -> Self {
        match err {
            KanbanError::Validation(message) => Self::Validation(message),
            KanbanError::NotFound { resource, id } => Self::NotFound { resource, id },
            other => Self::Internal(other.to_string()),
        }
    }
}
