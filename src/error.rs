//! Error types for the Shelfscan server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::ocr::OcrError;
use crate::registration::VerificationError;
use crate::session::PipelineError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Verification(#[from] VerificationError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Verification(e) => {
                if let VerificationError::Storage(inner) = e {
                    tracing::error!("Registration storage error: {}", inner);
                }
                (e.status_code(), e.code(), e.to_string())
            }
            AppError::Pipeline(e) => (e.status_code(), e.code(), e.to_string()),
            AppError::Ocr(e) => {
                tracing::warn!("OCR error: {}", e);
                (e.status_code(), "ocr_failed", e.to_string())
            }
            AppError::Serialize(e) => {
                tracing::error!("Serialization error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "serialization_error",
                    "Failed to encode response".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}
