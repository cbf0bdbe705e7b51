//! Busy / progress indicator
//!
//! There is one indicator for the whole server, which is why OCR runs one
//! file at a time.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use super::notifier::ViewNotifier;

pub const STATUS_IDLE: &str = "Waiting for an image";
pub const STATUS_STARTED: &str = "Running OCR…";
pub const STATUS_RECOGNIZING: &str = "Analyzing text";
pub const STATUS_DONE: &str = "OCR complete";
pub const STATUS_FAILED: &str = "OCR failed";

pub const PROGRESS_DONE: &str = "complete";
pub const PROGRESS_RETRY: &str = "Try again with a different image";

/// Snapshot of the indicator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub busy: bool,
    pub status_text: String,
    pub progress_text: String,
}

impl Default for StatusView {
    fn default() -> Self {
        Self {
            busy: false,
            status_text: STATUS_IDLE.to_string(),
            progress_text: String::new(),
        }
    }
}

/// Format a percentage the way the indicator shows it
pub fn percent_complete(percent: u32) -> String {
    format!("{}% complete", percent)
}

/// Shared progress indicator
#[derive(Clone)]
pub struct ProgressIndicator {
    state: Arc<RwLock<StatusView>>,
    notifier: ViewNotifier,
}

impl ProgressIndicator {
    pub fn new(notifier: ViewNotifier) -> Self {
        Self {
            state: Arc::new(RwLock::new(StatusView::default())),
            notifier,
        }
    }

    pub fn snapshot(&self) -> StatusView {
        self.state.read().clone()
    }

    /// Show the busy state at 0%
    pub fn begin(&self) {
        self.set(true, STATUS_STARTED, percent_complete(0));
    }

    /// Report recognition progress
    pub fn recognizing(&self, percent: u32) {
        self.set(true, STATUS_RECOGNIZING, percent_complete(percent));
    }

    /// Hide the busy state after a successful run
    pub fn succeeded(&self) {
        self.set(false, STATUS_DONE, PROGRESS_DONE.to_string());
    }

    /// Hide the busy state after a failed run
    pub fn failed(&self) {
        self.set(false, STATUS_FAILED, PROGRESS_RETRY.to_string());
    }

    fn set(&self, busy: bool, status: &str, progress: String) {
        {
            let mut state = self.state.write();
            state.busy = busy;
            state.status_text = status.to_string();
            state.progress_text = progress;
        }
        self.notifier.bump();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indicator_lifecycle() {
        let notifier = ViewNotifier::new();
        let indicator = ProgressIndicator::new(notifier.clone());
        assert_eq!(indicator.snapshot(), StatusView::default());

        indicator.begin();
        assert!(indicator.snapshot().busy);
        assert_eq!(indicator.snapshot().progress_text, "0% complete");

        indicator.recognizing(42);
        assert_eq!(indicator.snapshot().progress_text, "42% complete");
        assert_eq!(indicator.snapshot().status_text, STATUS_RECOGNIZING);

        indicator.failed();
        let view = indicator.snapshot();
        assert!(!view.busy);
        assert_eq!(view.status_text, STATUS_FAILED);
        assert_eq!(notifier.revision(), 3);
    }
}
