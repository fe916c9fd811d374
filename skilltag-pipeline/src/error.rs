//! Error types for skilltag-pipeline
//!
//! Only validation and persistence failures escape a run. Per-row
//! classification failures are absorbed into unresolved results by the
//! worker pool (see [`crate::services::classifier::ClassifyError`]).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Pipeline error type
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed input schema; raised before any classification starts
    #[error("Validation error: {0}")]
    Validation(String),

    /// Checkpoint or artifact read/write failure; fatal to the run
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// skilltag-common error
    #[error("Common error: {0}")]
    Common(#[from] skilltag_common::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    pub fn validation(msg: impl Into<String>) -> Self {
        PipelineError::Validation(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        PipelineError::Persistence(msg.into())
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

/// API error type for the status endpoints
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
        };

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
