//! Session Store
//!
//! Append-only, ordered history of upload sessions. Sessions are mutated
//! in place while OCR runs and never removed.

use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::types::{PipelineError, SessionStatus, UploadSession};
use crate::extract::BookRecord;
use crate::view::ViewNotifier;

/// Ordered session list
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    sessions: RwLock<Vec<UploadSession>>,
    notifier: ViewNotifier,
}

impl SessionStore {
    pub fn new(notifier: ViewNotifier) -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: RwLock::new(Vec::new()),
                notifier,
            }),
        }
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    /// Append a session to the end of the history
    pub async fn append(&self, session: UploadSession) {
        tracing::debug!(
            session_id = %session.id,
            file_name = %session.image_name,
            lfl_number = %session.lfl_number,
            "Session created"
        );
        self.inner.sessions.write().await.push(session);
        self.inner.notifier.bump();
    }

    /// Move an unresolved session to `status`
    pub async fn set_status(&self, id: Uuid, status: SessionStatus) -> Result<(), PipelineError> {
        self.update(id, |session| {
            if session.is_resolved() {
                tracing::warn!(session_id = %id, "Ignoring status change on resolved session");
                return;
            }
            session.status_label = status;
        })
        .await
    }

    /// Store extracted books and mark the session done
    pub async fn complete(&self, id: Uuid, books: Vec<BookRecord>) -> Result<(), PipelineError> {
        self.resolve(id, SessionStatus::Done, books).await
    }

    /// Mark the session failed, leaving its books empty
    pub async fn fail(&self, id: Uuid) -> Result<(), PipelineError> {
        self.resolve(id, SessionStatus::Failed, Vec::new()).await
    }

    async fn resolve(
        &self,
        id: Uuid,
        status: SessionStatus,
        books: Vec<BookRecord>,
    ) -> Result<(), PipelineError> {
        self.update(id, move |session| {
            // Books are fixed once OCR has resolved
            if session.is_resolved() {
                tracing::warn!(session_id = %id, "Session already resolved");
                return;
            }
            session.books = books;
            session.status_label = status;
        })
        .await
    }

    async fn update<F>(&self, id: Uuid, apply: F) -> Result<(), PipelineError>
    where
        F: FnOnce(&mut UploadSession),
    {
        {
            let mut sessions = self.inner.sessions.write().await;
            let session = sessions
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or_else(|| PipelineError::SessionNotFound(id.to_string()))?;
            apply(session);
        }
        self.inner.notifier.bump();
        Ok(())
    }

    // ========================================================================
    // Query Methods
    // ========================================================================

    pub async fn get(&self, id: Uuid) -> Result<UploadSession, PipelineError> {
        let sessions = self.inner.sessions.read().await;
        sessions
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| PipelineError::SessionNotFound(id.to_string()))
    }

    pub async fn get_by_str(&self, id: &str) -> Result<UploadSession, PipelineError> {
        let uuid = Uuid::parse_str(id).map_err(|_| PipelineError::SessionNotFound(id.to_string()))?;
        self.get(uuid).await
    }

    /// All sessions in upload order
    pub async fn list(&self) -> Vec<UploadSession> {
        self.inner.sessions.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.inner.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(ViewNotifier::new())
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let store = store();
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            store.append(UploadSession::new("L1", name)).await;
        }

        let names: Vec<_> = store.list().await.into_iter().map(|s| s.image_name).collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg", "c.jpg"]);
    }

    #[tokio::test]
    async fn test_books_fixed_after_resolution() {
        let store = store();
        let session = UploadSession::new("L1", "a.jpg");
        let id = session.id;
        store.append(session).await;

        store.set_status(id, SessionStatus::Processing).await.unwrap();
        store
            .complete(id, vec![BookRecord::titled("Dune")])
            .await
            .unwrap();

        // Later writes do not change a resolved session
        store.fail(id).await.unwrap();
        store.set_status(id, SessionStatus::Processing).await.unwrap();

        let session = store.get(id).await.unwrap();
        assert_eq!(session.status_label, SessionStatus::Done);
        assert_eq!(session.books, vec![BookRecord::titled("Dune")]);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let store = store();
        assert!(matches!(
            store.fail(Uuid::new_v4()).await,
            Err(PipelineError::SessionNotFound(_))
        ));
        assert!(store.get_by_str("not-a-uuid").await.is_err());
    }

    #[tokio::test]
    async fn test_mutations_bump_revision() {
        let notifier = ViewNotifier::new();
        let store = SessionStore::new(notifier.clone());
        let session = UploadSession::new("L1", "a.jpg");
        let id = session.id;

        store.append(session).await;
        store.set_status(id, SessionStatus::Processing).await.unwrap();
        store.fail(id).await.unwrap();

        assert_eq!(notifier.revision(), 3);
    }
}
