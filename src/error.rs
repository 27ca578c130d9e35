use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// A single field-level validation failure. `code` is a stable,
/// machine-readable identifier (`required`, `format`, `minute`, `past`,
/// `min_value`, `max_value`, ...); `message` is for humans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub code: &'static str,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &'static str, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("no drivers available for the requested time")]
    NoDriverAvailable,

    #[error("no drivers available at the given date")]
    NoOrderNearby,

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "error": message })),
            AppError::Validation(errors) => (StatusCode::BAD_REQUEST, json!({ "errors": errors })),
            AppError::Conflict(message) => (StatusCode::CONFLICT, json!({ "error": message })),
            AppError::NoDriverAvailable => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": "no drivers available for the requested time" }),
            ),
            AppError::NoOrderNearby => (
                StatusCode::NOT_FOUND,
                json!({ "message": "no drivers available at the given date" }),
            ),
            AppError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": message }))
            }
        };

        (status, Json(body)).into_response()
    }
}
