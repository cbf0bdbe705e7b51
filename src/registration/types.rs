//! Registration types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::StoreError;

// ============================================================================
// Constants
// ============================================================================

/// Blob key holding the JSON array of registrations
pub const REGISTRATIONS_KEY: &str = "lfl_registrations";

/// Blob key holding the active LFL number as a bare string
pub const ACTIVE_KEY: &str = "active_lfl_number";

/// Verification code range (inclusive), always six digits
pub const CODE_MIN: u32 = 100_000;
pub const CODE_MAX: u32 = 999_999;

// ============================================================================
// Records
// ============================================================================

/// A verified LFL number claimed by an email address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub number: String,
    pub email: String,
    pub verified_at: DateTime<Utc>,
}

/// An outstanding email code challenge
///
/// Never persisted; at most one exists at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingVerification {
    pub number: String,
    pub email: String,
    pub code: String,
    pub requested_at: DateTime<Utc>,
}

// ============================================================================
// Error Types
// ============================================================================

/// Verification and selection errors
///
/// All of these leave the registration state untouched.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("LFL number and email are both required")]
    MissingFields,

    #[error("No verification code has been requested")]
    NoPendingChallenge,

    #[error("Verification code does not match")]
    CodeMismatch,

    #[error("Verification code has expired, request a new one")]
    CodeExpired,

    #[error("LFL number is not registered: {0}")]
    UnknownNumber(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl VerificationError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::MissingFields | Self::CodeMismatch => StatusCode::BAD_REQUEST,
            Self::NoPendingChallenge => StatusCode::CONFLICT,
            Self::CodeExpired => StatusCode::GONE,
            Self::UnknownNumber(_) => StatusCode::NOT_FOUND,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingFields => "missing_fields",
            Self::NoPendingChallenge => "no_pending_challenge",
            Self::CodeMismatch => "code_mismatch",
            Self::CodeExpired => "code_expired",
            Self::UnknownNumber(_) => "unknown_number",
            Self::Storage(_) => "storage_error",
        }
    }
}
