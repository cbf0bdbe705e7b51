//! OCR Service
//!
//! Orchestrates OCR providers and exposes recognition as an event stream.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{
    provider::{OcrProviderTrait, OllamaProvider, ProgressSink, TesseractProvider},
    types::{OcrError, OcrEvent, OcrProvider, OcrResult},
};

/// OCR service configuration
#[derive(Debug, Clone)]
pub struct OcrServiceConfig {
    /// Preferred provider order
    pub providers: Vec<OcrProvider>,
    /// Tesseract binary name or path
    pub tesseract_bin: String,
    /// Ollama base URL
    pub ollama_url: String,
    /// Ollama model name
    pub ollama_model: String,
    /// Default OCR language hint
    pub default_language: String,
}

impl Default for OcrServiceConfig {
    fn default() -> Self {
        Self {
            providers: vec![OcrProvider::Tesseract],
            tesseract_bin: "tesseract".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            ollama_model: "llava".to_string(),
            default_language: "jpn+eng".to_string(),
        }
    }
}

/// OCR service
///
/// Cheap to clone; providers are shared.
#[derive(Clone)]
pub struct OcrService {
    inner: Arc<OcrServiceInner>,
}

struct OcrServiceInner {
    default_language: String,
    providers: Vec<Arc<dyn OcrProviderTrait>>,
}

impl OcrService {
    /// Create a new OCR service from configuration
    pub fn new(config: OcrServiceConfig) -> Self {
        let mut providers: Vec<Arc<dyn OcrProviderTrait>> = Vec::new();

        for provider in &config.providers {
            match provider {
                OcrProvider::Tesseract => {
                    providers.push(Arc::new(TesseractProvider::new(&config.tesseract_bin)));
                }
                OcrProvider::Ollama => {
                    providers.push(Arc::new(OllamaProvider::new(
                        &config.ollama_url,
                        &config.ollama_model,
                    )));
                }
            }
        }

        Self::with_providers(&config.default_language, providers)
    }

    /// Create a service over explicit provider instances, tried in order
    pub fn with_providers(
        default_language: &str,
        providers: Vec<Arc<dyn OcrProviderTrait>>,
    ) -> Self {
        Self {
            inner: Arc::new(OcrServiceInner {
                default_language: default_language.to_string(),
                providers,
            }),
        }
    }

    pub fn default_language(&self) -> &str {
        &self.inner.default_language
    }

    /// Get available providers
    pub async fn available_providers(&self) -> Vec<OcrProvider> {
        let mut available = Vec::new();
        for provider in &self.inner.providers {
            if provider.is_available().await {
                available.push(provider.provider_type());
            }
        }
        available
    }

    /// Perform OCR, trying providers in order until one succeeds
    pub async fn recognize(
        &self,
        image_data: &[u8],
        language: Option<&str>,
        progress: &ProgressSink,
    ) -> Result<OcrResult, OcrError> {
        let lang = language.unwrap_or(&self.inner.default_language);
        let mut last_error = None;

        for provider in &self.inner.providers {
            if !provider.is_available().await {
                tracing::debug!("OCR provider {:?} unavailable, skipping", provider.provider_type());
                continue;
            }

            match provider.recognize(image_data, lang, progress).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    tracing::warn!(
                        "OCR provider {:?} failed: {}, trying next",
                        provider.provider_type(),
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            OcrError::ProviderNotAvailable("No OCR providers available".to_string())
        }))
    }

    /// Start recognition in the background
    ///
    /// The returned job streams progress events and then one terminal
    /// [`OcrEvent::Finished`].
    pub fn start(&self, image_data: Vec<u8>, language: Option<String>) -> OcrJob {
        let (tx, rx) = mpsc::unbounded_channel();
        let service = self.clone();

        let handle = tokio::spawn(async move {
            let sink = ProgressSink::new(tx.clone());
            let result = service
                .recognize(&image_data, language.as_deref(), &sink)
                .await;
            let _ = tx.send(OcrEvent::Finished(result));
        });

        OcrJob {
            events: rx,
            handle,
            finished: false,
        }
    }
}

/// A running recognition
///
/// Dropping the job aborts the recognition task.
pub struct OcrJob {
    events: mpsc::UnboundedReceiver<OcrEvent>,
    handle: JoinHandle<()>,
    finished: bool,
}

impl OcrJob {
    /// Abort the recognition; the stream then ends with `Cancelled`
    pub fn cancel(&mut self) {
        self.handle.abort();
    }
}

impl Stream for OcrJob {
    type Item = OcrEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }

        match self.events.poll_recv(cx) {
            Poll::Ready(Some(event)) => {
                if matches!(event, OcrEvent::Finished(_)) {
                    self.finished = true;
                }
                Poll::Ready(Some(event))
            }
            // Task ended without a terminal event: it was aborted
            Poll::Ready(None) => {
                self.finished = true;
                Poll::Ready(Some(OcrEvent::Finished(Err(OcrError::Cancelled))))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for OcrJob {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::provider::ScriptedProvider;
    use futures::StreamExt;

    async fn collect(job: OcrJob) -> (Vec<f32>, Result<OcrResult, OcrError>) {
        let mut progress = Vec::new();
        let mut job = job;
        while let Some(event) = job.next().await {
            match event {
                OcrEvent::Progress(p) if p.is_recognizing() => progress.push(p.progress),
                OcrEvent::Progress(_) => {}
                OcrEvent::Finished(result) => return (progress, result),
            }
        }
        panic!("stream ended without a terminal event");
    }

    #[tokio::test]
    async fn test_ocr_service_creation() {
        let service = OcrService::new(OcrServiceConfig::default());
        assert_eq!(service.default_language(), "jpn+eng");
        assert_eq!(service.inner.providers.len(), 1);
    }

    #[tokio::test]
    async fn test_job_streams_progress_then_result() {
        let provider = ScriptedProvider::new(vec![Ok("Dune / Herbert".to_string())]);
        let service = OcrService::with_providers("eng", vec![Arc::new(provider)]);

        let (progress, result) = collect(service.start(vec![1, 2, 3], None)).await;

        assert_eq!(progress, vec![0.5, 1.0]);
        assert_eq!(result.unwrap().text, "Dune / Herbert");
    }

    #[tokio::test]
    async fn test_falls_back_to_next_provider() {
        let failing = ScriptedProvider::new(vec![Err(OcrError::ProcessingError("boom".into()))]);
        let working = ScriptedProvider::new(vec![Ok("ok".to_string())]);
        let service =
            OcrService::with_providers("eng", vec![Arc::new(failing), Arc::new(working)]);

        let result = service.recognize(b"img", None, &ProgressSink::discard()).await;
        assert_eq!(result.unwrap().text, "ok");
    }

    #[tokio::test]
    async fn test_no_available_provider() {
        let mut provider = ScriptedProvider::new(vec![Ok("never".to_string())]);
        provider.available = false;
        let service = OcrService::with_providers("eng", vec![Arc::new(provider)]);

        let (_, result) = collect(service.start(vec![], None)).await;
        assert!(matches!(result, Err(OcrError::ProviderNotAvailable(_))));
    }

    #[tokio::test]
    async fn test_cancelled_job_ends_with_cancelled() {
        struct Stalled;

        #[async_trait::async_trait]
        impl OcrProviderTrait for Stalled {
            fn provider_type(&self) -> OcrProvider {
                OcrProvider::Tesseract
            }
            async fn is_available(&self) -> bool {
                true
            }
            async fn recognize(
                &self,
                _image_data: &[u8],
                _language: &str,
                _progress: &ProgressSink,
            ) -> Result<OcrResult, OcrError> {
                futures::future::pending().await
            }
        }

        let service = OcrService::with_providers("eng", vec![Arc::new(Stalled)]);
        let mut job = service.start(vec![], None);
        job.cancel();

        let (_, result) = collect(job).await;
        assert!(matches!(result, Err(OcrError::Cancelled)));
    }
}
