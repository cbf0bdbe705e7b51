//! Application state management
//!
//! `AppState` owns every piece of mutable state and is the only place the
//! registration guard meets the OCR pipeline.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::{Config, Variant};
use crate::error::AppError;
use crate::ocr::OcrService;
use crate::registration::RegistrationService;
use crate::session::{validate_upload, OcrPipeline, PipelineError, PreviewCache, SessionStore, UploadFile};
use crate::storage::{BlobStore, FileBlobStore, MemoryBlobStore};
use crate::view::{ProgressIndicator, ViewNotifier};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    registrations: Mutex<RegistrationService>,
    pipeline: OcrPipeline,
    notifier: ViewNotifier,
}

impl AppState {
    /// Create state from configuration, loading registrations from disk
    pub fn new(config: Config) -> Self {
        let blob: Arc<dyn BlobStore> = match &config.storage.blob_path {
            Some(path) => Arc::new(FileBlobStore::open(path)),
            None => Arc::new(MemoryBlobStore::new()),
        };
        let ocr = OcrService::new(config.ocr.clone());
        Self::with_parts(config, blob, ocr)
    }

    /// Create state over an explicit blob store and OCR service
    pub fn with_parts(config: Config, blob: Arc<dyn BlobStore>, ocr: OcrService) -> Self {
        let notifier = ViewNotifier::new();
        let registrations = RegistrationService::load(blob, config.verification.code_ttl());
        let pipeline = OcrPipeline::new(
            ocr,
            SessionStore::new(notifier.clone()),
            PreviewCache::with_capacity(config.server.preview_capacity),
            ProgressIndicator::new(notifier.clone()),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                registrations: Mutex::new(registrations),
                pipeline,
                notifier,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn variant(&self) -> Variant {
        self.inner.config.variant
    }

    /// Get the registration state
    ///
    /// The lock is synchronous; never hold it across an await.
    pub fn registrations(&self) -> &Mutex<RegistrationService> {
        &self.inner.registrations
    }

    /// Get the OCR pipeline
    pub fn pipeline(&self) -> &OcrPipeline {
        &self.inner.pipeline
    }

    pub fn sessions(&self) -> &SessionStore {
        self.inner.pipeline.sessions()
    }

    pub fn notifier(&self) -> &ViewNotifier {
        &self.inner.notifier
    }

    /// Run `apply` against the registration state on the blocking pool
    ///
    /// Registration changes write the blob store synchronously, so they
    /// stay off the async workers.
    pub async fn with_registrations<T, F>(&self, apply: F) -> crate::error::Result<T>
    where
        F: FnOnce(&mut RegistrationService) -> T + Send + 'static,
        T: Send + 'static,
    {
        let state = self.clone();
        tokio::task::spawn_blocking(move || apply(&mut *state.inner.registrations.lock()))
            .await
            .map_err(|e| AppError::Internal(format!("Registration task failed: {}", e)))
    }

    /// Change the active LFL number and tell clients to re-render
    pub async fn select_active(&self, number: &str) -> crate::error::Result<()> {
        let number = number.to_string();
        self.with_registrations(move |registrations| registrations.select_active(&number))
            .await??;
        self.inner.notifier.bump();
        Ok(())
    }

    /// Check a batch and capture the LFL number it will be tagged with
    ///
    /// Refuses to start without an active registration.
    pub fn prepare_batch(&self, files: &[UploadFile]) -> Result<String, PipelineError> {
        let active = self
            .inner
            .registrations
            .lock()
            .active()
            .map(str::to_string)
            .ok_or(PipelineError::NoActiveRegistration)?;

        if files.is_empty() {
            return Err(PipelineError::NoFiles);
        }
        for file in files {
            validate_upload(file)?;
        }

        Ok(active)
    }

    /// Guarded batch upload: validate, then hand the files to the OCR lane
    ///
    /// Returns the LFL number the sessions are tagged with and the batch
    /// task. The batch keeps running if the handle is dropped.
    pub fn start_batch(
        &self,
        files: Vec<UploadFile>,
    ) -> Result<(String, JoinHandle<Vec<Uuid>>), PipelineError> {
        let lfl_number = self.prepare_batch(&files)?;
        let batch = self.inner.pipeline.spawn_batch(lfl_number.clone(), files);
        Ok((lfl_number, batch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{OcrError, ScriptedProvider};

    fn state(outcomes: Vec<Result<String, OcrError>>) -> AppState {
        let ocr = OcrService::with_providers("eng", vec![Arc::new(ScriptedProvider::new(outcomes))]);
        AppState::with_parts(Config::default(), Arc::new(MemoryBlobStore::new()), ocr)
    }

    fn register(state: &AppState, number: &str) {
        let mut registrations = state.registrations().lock();
        let pending = registrations.request_code(number, "a@b.com").unwrap();
        registrations.verify_code(&pending.code).unwrap();
    }

    #[tokio::test]
    async fn test_guard_without_active_registration() {
        let state = state(vec![Ok("Dune".to_string())]);

        let result = state.start_batch(vec![UploadFile::new("a.jpg", vec![1u8])]);

        assert!(matches!(result, Err(PipelineError::NoActiveRegistration)));
        assert!(state.sessions().is_empty().await);
    }

    #[tokio::test]
    async fn test_sessions_tagged_with_active_number() {
        let state = state(vec![Ok("Dune".to_string()), Ok("Emma".to_string())]);
        register(&state, "L7");

        let (lfl_number, batch) = state
            .start_batch(vec![
                UploadFile::new("a.jpg", vec![1u8]),
                UploadFile::new("b.png", vec![2u8]),
            ])
            .unwrap();
        let ids = batch.await.unwrap();

        assert_eq!(lfl_number, "L7");
        assert_eq!(ids.len(), 2);
        let sessions = state.sessions().list().await;
        assert!(sessions.iter().all(|s| s.lfl_number == "L7"));
    }

    #[tokio::test]
    async fn test_rejects_non_images_before_starting() {
        let state = state(vec![]);
        register(&state, "L1");

        let result = state.start_batch(vec![
            UploadFile::new("a.jpg", vec![1u8]),
            UploadFile::new("notes.txt", vec![2u8]),
        ]);

        assert!(matches!(result, Err(PipelineError::NotAnImage(_))));
        assert!(state.sessions().is_empty().await);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let state = state(vec![]);
        register(&state, "L1");
        assert!(matches!(state.start_batch(Vec::new()), Err(PipelineError::NoFiles)));
    }

    #[tokio::test]
    async fn test_select_active_persists_and_notifies() {
        let blob: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
        let state = AppState::with_parts(
            Config::default(),
            blob.clone(),
            OcrService::with_providers("eng", vec![]),
        );
        register(&state, "L1");
        register(&state, "L2");
        let before = state.notifier().revision();

        state.select_active("L1").await.unwrap();

        assert_eq!(state.registrations().lock().active(), Some("L1"));
        assert_eq!(blob.get(crate::registration::ACTIVE_KEY), Some("L1".to_string()));
        assert!(state.notifier().revision() > before);

        let unknown = state.select_active("L9").await;
        assert!(matches!(
            unknown,
            Err(AppError::Verification(crate::registration::VerificationError::UnknownNumber(_)))
        ));
        assert_eq!(state.registrations().lock().active(), Some("L1"));
    }
}
