//! Shared error handling for API endpoints.
//!
//! User-facing bodies carry sanitized messages only. Unexpected failures get
//! a correlation id; the full detail goes to the security log and never to
//! the caller.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::security_log;

/// Extension trait for concise error mapping on Results.
pub trait ResultExt<T> {
    fn db_err(self, context: &str) -> Result<T, ApiError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn db_err(self, context: &str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::internal(context, e))
    }
}

/// API error type with automatic response conversion.
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal { correlation_id: String },
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Record an unexpected failure and hand the caller only a correlation id.
    pub fn internal(context: &str, e: impl std::fmt::Display) -> Self {
        let correlation_id = security_log::incident(context, e);
        Self::Internal { correlation_id }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(rename = "correlationId", skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, correlation_id) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
            ApiError::Internal { correlation_id } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unexpected failure".to_string(),
                Some(correlation_id),
            ),
        };
        (
            status,
            Json(ErrorResponse {
                error: message,
                correlation_id,
            }),
        )
            .into_response()
    }
}
