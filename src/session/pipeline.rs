//! OCR Pipeline
//!
//! Drives uploaded images through OCR and the book extractor.
//!
//! Files are processed strictly one after another, across batches too:
//! a single lane mutex is held for the whole batch. Each file gets its own
//! session; a failure marks that session failed and the batch moves on.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::preview::PreviewCache;
use super::store::SessionStore;
use super::types::{SessionStatus, UploadFile, UploadSession};
use crate::extract::{parse_ocr_text, BookRecord};
use crate::ocr::{OcrError, OcrEvent, OcrProvider, OcrResult, OcrService};
use crate::view::ProgressIndicator;

/// Sequential OCR pipeline
#[derive(Clone)]
pub struct OcrPipeline {
    ocr: OcrService,
    sessions: SessionStore,
    previews: PreviewCache,
    indicator: ProgressIndicator,
    /// Result of the most recent single-image run
    latest: Arc<RwLock<Vec<BookRecord>>>,
    lane: Arc<Mutex<()>>,
}

impl OcrPipeline {
    pub fn new(
        ocr: OcrService,
        sessions: SessionStore,
        previews: PreviewCache,
        indicator: ProgressIndicator,
    ) -> Self {
        Self {
            ocr,
            sessions,
            previews,
            indicator,
            latest: Arc::new(RwLock::new(Vec::new())),
            lane: Arc::new(Mutex::new(())),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn previews(&self) -> &PreviewCache {
        &self.previews
    }

    pub fn indicator(&self) -> &ProgressIndicator {
        &self.indicator
    }

    /// Providers that answer their availability check
    pub async fn ocr_providers_available(&self) -> Vec<OcrProvider> {
        self.ocr.available_providers().await
    }

    /// Books from the most recent single-image run
    pub async fn latest(&self) -> Vec<BookRecord> {
        self.latest.read().await.clone()
    }

    // ========================================================================
    // Session batches
    // ========================================================================

    /// Run every file through OCR in order, tagging sessions with `lfl_number`
    ///
    /// Returns the created session IDs in upload order.
    pub async fn process_files(&self, lfl_number: &str, files: Vec<UploadFile>) -> Vec<Uuid> {
        let _lane = self.lane.lock().await;

        tracing::info!(lfl_number = %lfl_number, files = files.len(), "Processing upload batch");

        let mut ids = Vec::with_capacity(files.len());
        for file in files {
            ids.push(self.process_file(lfl_number, file).await);
        }
        ids
    }

    /// Run [`process_files`](Self::process_files) on its own task
    ///
    /// The batch runs to completion even if the handle is dropped, so a
    /// caller that stops waiting never leaves a session half processed.
    pub fn spawn_batch(&self, lfl_number: String, files: Vec<UploadFile>) -> JoinHandle<Vec<Uuid>> {
        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.process_files(&lfl_number, files).await })
    }

    async fn process_file(&self, lfl_number: &str, file: UploadFile) -> Uuid {
        let session = UploadSession::new(lfl_number, &file.name);
        let id = session.id;
        self.sessions.append(session).await;

        // Fire and forget; OCR does not wait for the preview
        let _ = self.previews.load(id, &file);

        if let Err(e) = self.sessions.set_status(id, SessionStatus::Processing).await {
            tracing::error!(session_id = %id, "Failed to start session: {}", e);
        }

        let outcome = self.recognize(file.data.to_vec()).await;

        let stored = match outcome {
            Ok(result) => {
                let books = parse_ocr_text(&result.text);
                tracing::info!(
                    session_id = %id,
                    file_name = %file.name,
                    provider = ?result.provider,
                    books = books.len(),
                    "OCR complete"
                );
                self.sessions.complete(id, books).await
            }
            Err(e) => {
                tracing::error!(session_id = %id, file_name = %file.name, "OCR failed: {}", e);
                self.sessions.fail(id).await
            }
        };

        if let Err(e) = stored {
            tracing::error!(session_id = %id, "Failed to store OCR outcome: {}", e);
        }

        id
    }

    // ========================================================================
    // Single image
    // ========================================================================

    /// OCR one image and replace the latest extraction with its books
    ///
    /// The previous extraction is cleared before OCR starts.
    pub async fn run_single(&self, file: UploadFile) -> Result<Vec<BookRecord>, OcrError> {
        let _lane = self.lane.lock().await;

        self.latest.write().await.clear();

        let result = self.recognize(file.data.to_vec()).await;
        match result {
            Ok(result) => {
                let books = parse_ocr_text(&result.text);
                tracing::info!(file_name = %file.name, books = books.len(), "OCR complete");
                *self.latest.write().await = books.clone();
                Ok(books)
            }
            Err(e) => {
                tracing::error!(file_name = %file.name, "OCR failed: {}", e);
                Err(e)
            }
        }
    }

    /// Run [`run_single`](Self::run_single) on its own task
    pub fn spawn_single(&self, file: UploadFile) -> JoinHandle<Result<Vec<BookRecord>, OcrError>> {
        let pipeline = self.clone();
        tokio::spawn(async move { pipeline.run_single(file).await })
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Run one OCR job, mirroring its progress on the indicator
    async fn recognize(&self, image: Vec<u8>) -> Result<OcrResult, OcrError> {
        self.indicator.begin();

        let mut job = self.ocr.start(image, None);
        let mut outcome = Err(OcrError::Cancelled);

        while let Some(event) = job.next().await {
            match event {
                OcrEvent::Progress(progress) if progress.is_recognizing() => {
                    self.indicator.recognizing(progress.percent());
                }
                OcrEvent::Progress(progress) => {
                    tracing::trace!(status = %progress.status, "OCR progress");
                }
                OcrEvent::Finished(result) => {
                    outcome = result;
                    break;
                }
            }
        }

        match &outcome {
            Ok(_) => self.indicator.succeeded(),
            Err(_) => self.indicator.failed(),
        }
        outcome
    }
}
