//! Error types for members-api

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404, empty JSON object body)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400, plain-text body)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// members-common error
    #[error("Common error: {0}")]
    Common(#[from] members_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(what) => {
                tracing::debug!(what = %what, "Lookup returned nothing");
                return (StatusCode::NOT_FOUND, Json(json!({}))).into_response();
            }
            ApiError::BadRequest(msg) => {
                return (StatusCode::BAD_REQUEST, msg).into_response();
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        tracing::error!(code = error_code, error = %message, "Request failed");

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
pub type ApiResult<T> = Result<T, ApiError>;
