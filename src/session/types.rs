//! Upload session types

use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::extract::BookRecord;

// ============================================================================
// Constants
// ============================================================================

/// Maximum size of one uploaded image: 20MB
pub const MAX_IMAGE_SIZE: usize = 20 * 1024 * 1024;

/// Number of image previews kept in memory
pub const DEFAULT_PREVIEW_CAPACITY: usize = 64;

// ============================================================================
// Session Types
// ============================================================================

/// One uploaded image and what OCR made of it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    /// Unique session ID
    pub id: Uuid,

    /// LFL number active when the file was accepted
    pub lfl_number: String,

    /// Original file name
    pub image_name: String,

    /// When the file was accepted
    pub uploaded_at: DateTime<Utc>,

    /// Extracted books; empty until OCR resolves
    pub books: Vec<BookRecord>,

    /// Current status
    pub status_label: SessionStatus,
}

impl UploadSession {
    /// Create a waiting session
    pub fn new(lfl_number: &str, image_name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            lfl_number: lfl_number.to_string(),
            image_name: image_name.to_string(),
            uploaded_at: Utc::now(),
            books: Vec::new(),
            status_label: SessionStatus::Waiting,
        }
    }

    /// Whether OCR has resolved, either way
    pub fn is_resolved(&self) -> bool {
        matches!(self.status_label, SessionStatus::Done | SessionStatus::Failed)
    }
}

/// Session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Accepted, OCR not started
    Waiting,
    /// OCR running
    Processing,
    /// OCR succeeded, books stored
    Done,
    /// OCR failed, no books
    Failed,
}

impl SessionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

// ============================================================================
// Upload Input
// ============================================================================

/// An image received from a client
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            data: data.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Declared content type, else a guess from the file name
    pub fn mime_type(&self) -> String {
        match &self.content_type {
            Some(content_type)
                if !content_type.is_empty() && content_type != "application/octet-stream" =>
            {
                content_type.clone()
            }
            _ => mime_guess::from_path(&self.name)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Pipeline error types
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Register and select an LFL number before uploading images")]
    NoActiveRegistration,

    #[error("No image files were uploaded")]
    NoFiles,

    #[error("Not an image: {0}")]
    NotAnImage(String),

    #[error("Image too large: {name} is {size} bytes (max: {max})")]
    ImageTooLarge { name: String, size: usize, max: usize },

    #[error("Session not found: {0}")]
    SessionNotFound(String),
}

impl PipelineError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::NoActiveRegistration => StatusCode::CONFLICT,
            Self::NoFiles => StatusCode::BAD_REQUEST,
            Self::NotAnImage(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::ImageTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NoActiveRegistration => "no_active_registration",
            Self::NoFiles => "no_files",
            Self::NotAnImage(_) => "not_an_image",
            Self::ImageTooLarge { .. } => "image_too_large",
            Self::SessionNotFound(_) => "session_not_found",
        }
    }
}

/// Check an upload before it enters the pipeline
pub fn validate_upload(file: &UploadFile) -> Result<(), PipelineError> {
    if !file.mime_type().starts_with("image/") {
        return Err(PipelineError::NotAnImage(file.name.clone()));
    }
    if file.data.len() > MAX_IMAGE_SIZE {
        return Err(PipelineError::ImageTooLarge {
            name: file.name.clone(),
            size: file.data.len(),
            max: MAX_IMAGE_SIZE,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_waiting() {
        let session = UploadSession::new("L1", "shelf.jpg");
        assert_eq!(session.status_label, SessionStatus::Waiting);
        assert!(session.books.is_empty());
        assert!(!session.is_resolved());
    }

    #[test]
    fn test_session_json_shape() {
        let session = UploadSession::new("L1", "shelf.jpg");
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["lflNumber"], "L1");
        assert_eq!(json["imageName"], "shelf.jpg");
        assert_eq!(json["statusLabel"], "waiting");
        assert!(json["uploadedAt"].is_string());
        assert!(json["books"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_mime_type_guess() {
        assert_eq!(UploadFile::new("a.png", vec![1u8]).mime_type(), "image/png");
        assert_eq!(
            UploadFile::new("blob", vec![1u8])
                .with_content_type("image/jpeg")
                .mime_type(),
            "image/jpeg"
        );
        assert_eq!(
            UploadFile::new("notes.txt", vec![1u8]).mime_type(),
            "text/plain"
        );
    }

    #[test]
    fn test_validate_upload() {
        assert!(validate_upload(&UploadFile::new("a.jpg", vec![0u8; 10])).is_ok());
        assert!(matches!(
            validate_upload(&UploadFile::new("a.pdf", vec![0u8; 10])),
            Err(PipelineError::NotAnImage(_))
        ));
        assert!(matches!(
            validate_upload(&UploadFile::new("a.jpg", vec![0u8; MAX_IMAGE_SIZE + 1])),
            Err(PipelineError::ImageTooLarge { .. })
        ));
    }
}
