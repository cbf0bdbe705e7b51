//! OCR Types
//!
//! Defines the events and results exchanged with OCR engines.

use serde::{Deserialize, Serialize};

/// Progress phase reported while the engine reads characters
pub const RECOGNIZING_TEXT: &str = "recognizing text";

/// OCR provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrProvider {
    /// Tesseract OCR (local CLI)
    Tesseract,
    /// Ollama vision model (local LLM)
    Ollama,
}

impl Default for OcrProvider {
    fn default() -> Self {
        Self::Tesseract
    }
}

impl std::str::FromStr for OcrProvider {
    type Err = OcrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tesseract" => Ok(Self::Tesseract),
            "ollama" => Ok(Self::Ollama),
            other => Err(OcrError::ProviderNotAvailable(format!(
                "unknown provider '{}'",
                other
            ))),
        }
    }
}

/// Progress event emitted by an engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OcrProgress {
    /// Engine phase, e.g. "loading language" or "recognizing text"
    pub status: String,
    /// Completion of the phase in [0, 1]
    pub progress: f32,
}

impl OcrProgress {
    pub fn new(status: impl Into<String>, progress: f32) -> Self {
        Self {
            status: status.into(),
            progress: progress.clamp(0.0, 1.0),
        }
    }

    pub fn recognizing(progress: f32) -> Self {
        Self::new(RECOGNIZING_TEXT, progress)
    }

    /// Whether this event belongs to the text recognition phase
    pub fn is_recognizing(&self) -> bool {
        self.status == RECOGNIZING_TEXT
    }

    /// Rounded percentage, 0..=100
    pub fn percent(&self) -> u32 {
        (self.progress * 100.0).round() as u32
    }
}

/// OCR result
#[derive(Debug, Clone, Serialize)]
pub struct OcrResult {
    /// Recognized text
    pub text: String,
    /// Provider used
    pub provider: OcrProvider,
}

/// Event stream item produced by an [`OcrJob`](super::OcrJob)
///
/// A job yields any number of `Progress` events followed by exactly one
/// `Finished`.
#[derive(Debug)]
pub enum OcrEvent {
    Progress(OcrProgress),
    Finished(Result<OcrResult, OcrError>),
}

/// OCR error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum OcrError {
    #[error("OCR provider not available: {0}")]
    ProviderNotAvailable(String),

    #[error("OCR processing failed: {0}")]
    ProcessingError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("OCR job was cancelled")]
    Cancelled,
}

impl OcrError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::ProviderNotAvailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::ApiError(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_rounds() {
        assert_eq!(OcrProgress::recognizing(0.0).percent(), 0);
        assert_eq!(OcrProgress::recognizing(0.424).percent(), 42);
        assert_eq!(OcrProgress::recognizing(0.425).percent(), 43);
        assert_eq!(OcrProgress::recognizing(1.0).percent(), 100);
    }

    #[test]
    fn test_progress_is_clamped() {
        assert_eq!(OcrProgress::new("x", 1.7).progress, 1.0);
        assert_eq!(OcrProgress::new("x", -0.2).progress, 0.0);
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("Tesseract".parse::<OcrProvider>().unwrap(), OcrProvider::Tesseract);
        assert_eq!(" ollama ".parse::<OcrProvider>().unwrap(), OcrProvider::Ollama);
        assert!("openai".parse::<OcrProvider>().is_err());
    }
}
