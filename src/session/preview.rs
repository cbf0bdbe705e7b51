//! Image previews
//!
//! Uploaded images are kept in a small in-memory cache so clients can show
//! what was scanned. Loading runs on its own task and never holds up OCR.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use axum::body::Bytes;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::types::UploadFile;

/// A stored preview image
#[derive(Debug, Clone)]
pub struct Preview {
    pub content_type: String,
    pub data: Bytes,
}

/// Bounded preview cache; oldest entries are evicted first
#[derive(Clone)]
pub struct PreviewCache {
    inner: Arc<RwLock<PreviewCacheInner>>,
    capacity: usize,
}

struct PreviewCacheInner {
    entries: HashMap<Uuid, Preview>,
    order: VecDeque<Uuid>,
}

impl PreviewCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(PreviewCacheInner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            })),
            capacity,
        }
    }

    /// Start loading the preview for session `id` in the background
    pub fn load(&self, id: Uuid, file: &UploadFile) -> JoinHandle<()> {
        let cache = self.clone();
        let preview = Preview {
            content_type: file.mime_type(),
            data: file.data.clone(),
        };

        tokio::spawn(async move {
            cache.insert(id, preview).await;
        })
    }

    pub async fn insert(&self, id: Uuid, preview: Preview) {
        if self.capacity == 0 {
            return;
        }

        let mut inner = self.inner.write().await;
        if inner.entries.insert(id, preview).is_none() {
            inner.order.push_back(id);
        }

        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
                tracing::debug!(session_id = %oldest, "Evicted preview");
            }
        }
    }

    pub async fn get(&self, id: Uuid) -> Option<Preview> {
        self.inner.read().await.entries.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }
}
