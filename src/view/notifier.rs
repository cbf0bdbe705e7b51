//! Change notification
//!
//! Every state mutation bumps a revision number. Clients watching the
//! revision re-render when it moves.

use std::sync::Arc;

use tokio::sync::watch;

/// Revision counter shared by all state holders
#[derive(Clone)]
pub struct ViewNotifier {
    tx: Arc<watch::Sender<u64>>,
}

impl ViewNotifier {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Signal that the view is stale
    pub fn bump(&self) {
        self.tx.send_modify(|revision| *revision += 1);
    }

    pub fn revision(&self) -> u64 {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}

impl Default for ViewNotifier {
    fn default() -> Self {
        Self::new()
    }
}
