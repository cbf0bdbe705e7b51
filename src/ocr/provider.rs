//! OCR Providers
//!
//! Defines the provider trait and implementations for different OCR backends.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{OcrError, OcrEvent, OcrProgress, OcrProvider, OcrResult};

/// Channel end handed to providers for progress reporting
#[derive(Clone)]
pub struct ProgressSink {
    tx: Option<mpsc::UnboundedSender<OcrEvent>>,
}

impl ProgressSink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<OcrEvent>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A sink that drops every event
    pub fn discard() -> Self {
        Self { tx: None }
    }

    pub fn report(&self, progress: OcrProgress) {
        if let Some(tx) = &self.tx {
            // Receiver gone means nobody is watching any more
            let _ = tx.send(OcrEvent::Progress(progress));
        }
    }
}

/// OCR provider trait
#[async_trait]
pub trait OcrProviderTrait: Send + Sync {
    /// Get the provider type
    fn provider_type(&self) -> OcrProvider;

    /// Check if the provider is available
    async fn is_available(&self) -> bool;

    /// Perform OCR on an image
    async fn recognize(
        &self,
        image_data: &[u8],
        language: &str,
        progress: &ProgressSink,
    ) -> Result<OcrResult, OcrError>;
}

/// Tesseract OCR provider
///
/// Pipes the image through the `tesseract` binary (`stdin` → `stdout`).
/// The CLI does not report progress, so only the start and end of the
/// recognition phase are emitted.
pub struct TesseractProvider {
    binary: String,
}

impl TesseractProvider {
    pub fn new(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
        }
    }
}

#[async_trait]
impl OcrProviderTrait for TesseractProvider {
    fn provider_type(&self) -> OcrProvider {
        OcrProvider::Tesseract
    }

    async fn is_available(&self) -> bool {
        tokio::process::Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    async fn recognize(
        &self,
        image_data: &[u8],
        language: &str,
        progress: &ProgressSink,
    ) -> Result<OcrResult, OcrError> {
        use std::process::Stdio;
        use tokio::io::AsyncWriteExt;

        progress.report(OcrProgress::recognizing(0.0));

        let mut child = tokio::process::Command::new(&self.binary)
            .arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(language)
            .arg("--psm")
            .arg("3")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| OcrError::ProcessingError(format!("Failed to run tesseract: {}", e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(image_data)
                .await
                .map_err(|e| OcrError::ProcessingError(format!("Failed to write image: {}", e)))?;
            // Closing stdin tells tesseract the image is complete
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| OcrError::ProcessingError(format!("Tesseract did not finish: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::ProcessingError(format!(
                "Tesseract failed: {}",
                stderr.trim()
            )));
        }

        progress.report(OcrProgress::recognizing(1.0));

        Ok(OcrResult {
            text: String::from_utf8_lossy(&output.stdout).into_owned(),
            provider: OcrProvider::Tesseract,
        })
    }
}

/// Ollama vision model provider
pub struct OllamaProvider {
    client: reqwest::Client,
    /// Ollama API URL
    base_url: String,
    /// Model name (e.g., "llava", "bakllava")
    model: String,
}

impl OllamaProvider {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl OcrProviderTrait for OllamaProvider {
    fn provider_type(&self) -> OcrProvider {
        OcrProvider::Ollama
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn recognize(
        &self,
        image_data: &[u8],
        language: &str,
        progress: &ProgressSink,
    ) -> Result<OcrResult, OcrError> {
        use base64::Engine;

        let url = format!("{}/api/generate", self.base_url);
        let image_base64 = base64::engine::general_purpose::STANDARD.encode(image_data);

        // Keep one book per line so the slash heuristic still applies
        let prompt = format!(
            "Extract all text from this image exactly as written. The text language hint is {}. \
             Put each book spine or cover on its own line and separate title, author and \
             publisher with ' / '. Return only the extracted text, nothing else.",
            language
        );

        let request = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "images": [image_base64],
            "stream": false
        });

        progress.report(OcrProgress::recognizing(0.0));

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| OcrError::ApiError(format!("Failed to call Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::ApiError(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| OcrError::ApiError(format!("Failed to parse response: {}", e)))?;

        let text = result["response"].as_str().unwrap_or("").to_string();

        progress.report(OcrProgress::recognizing(1.0));

        Ok(OcrResult {
            text,
            provider: OcrProvider::Ollama,
        })
    }
}

/// Scripted provider for tests
///
/// Answers each call with the next scripted outcome, reporting a few
/// progress events first.
#[cfg(test)]
pub struct ScriptedProvider {
    outcomes: parking_lot::Mutex<std::collections::VecDeque<Result<String, OcrError>>>,
    pub available: bool,
    /// Time each call spends "recognizing"
    pub delay: Option<std::time::Duration>,
}

#[cfg(test)]
impl ScriptedProvider {
    pub fn new(outcomes: Vec<Result<String, OcrError>>) -> Self {
        Self {
            outcomes: parking_lot::Mutex::new(outcomes.into()),
            available: true,
            delay: None,
        }
    }
}

#[cfg(test)]
#[async_trait]
impl OcrProviderTrait for ScriptedProvider {
    fn provider_type(&self) -> OcrProvider {
        OcrProvider::Tesseract
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn recognize(
        &self,
        _image_data: &[u8],
        _language: &str,
        progress: &ProgressSink,
    ) -> Result<OcrResult, OcrError> {
        progress.report(OcrProgress::new("loading language traineddata", 1.0));
        progress.report(OcrProgress::recognizing(0.5));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        progress.report(OcrProgress::recognizing(1.0));

        let outcome = self
            .outcomes
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(OcrError::ProcessingError("script exhausted".to_string())));

        outcome.map(|text| OcrResult {
            text,
            provider: OcrProvider::Tesseract,
        })
    }
}
