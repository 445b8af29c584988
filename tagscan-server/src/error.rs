//! Error types for tagscan-server
//!
//! Only request-level failures become HTTP errors. Per-image failures never
//! reach this type; they are reported inside the batch outcomes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tagscan_common::api::AuthError;
use thiserror::Error;

use crate::models::BatchResult;
use crate::services::BatchError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Missing or rejected credential (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    /// Every image failed (502); carries the per-image results
    #[error("All images failed extraction")]
    BatchFailed(BatchResult),
}

impl From<BatchError> for ApiError {
    fn from(err: BatchError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            ApiError::Unauthorized(err) => (StatusCode::UNAUTHORIZED, err.code(), err.to_string()),
            ApiError::BatchFailed(_) => (
                StatusCode::BAD_GATEWAY,
                "EXTRACTION_FAILED",
                self.to_string(),
            ),
        };

        let mut body = json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        });

        if let ApiError::BatchFailed(result) = self {
            body["texts"] = json!(result.texts);
            body["outcomes"] = json!(result.outcomes);
        }

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
