//! Session Routes
//!
//! Multi-image uploads tagged with the active LFL number, and the session
//! history they build up.
//!
//! Endpoints:
//! - POST /api/v1/sessions - Upload images (multipart), `?wait=true` to block
//! - GET /api/v1/sessions - All sessions in upload order
//! - GET /api/v1/sessions/history - History rows
//! - GET /api/v1/sessions/events - Server-sent revision events
//! - GET /api/v1/sessions/books.json - Download all sessions
//! - GET /api/v1/sessions/:id - One session
//! - GET /api/v1/sessions/:id/preview - The uploaded image

use std::convert::Infallible;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::get,
    Json, Router,
};
use futures::{stream, Stream, StreamExt};
use serde::{Deserialize, Serialize};

use super::{json_download, read_upload_files};
use crate::error::{AppError, Result};
use crate::session::{PipelineError, UploadSession, MAX_IMAGE_SIZE};
use crate::state::AppState;
use crate::view::{export_json, history_view, HistoryRow};

/// Largest batch body accepted in one request
const MAX_BATCH_BODY: usize = 10 * MAX_IMAGE_SIZE;

/// Create the sessions router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sessions).post(upload))
        .route("/history", get(history))
        .route("/events", get(events))
        .route("/books.json", get(download_sessions))
        .route("/:session_id", get(get_session))
        .route("/:session_id/preview", get(get_preview))
        .layer(DefaultBodyLimit::max(MAX_BATCH_BODY))
}

#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    /// Block until the batch has been processed
    #[serde(default)]
    pub wait: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadAccepted {
    pub accepted: usize,
    pub lfl_number: String,
}

/// POST /api/v1/sessions
async fn upload(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    multipart: Multipart,
) -> Result<Response> {
    let files = read_upload_files(multipart).await?;
    let accepted = files.len();
    let (lfl_number, batch) = state.start_batch(files)?;

    if query.wait {
        // Dropping the handle detaches; the batch finishes without us
        let ids = batch
            .await
            .map_err(|e| AppError::Internal(format!("Upload batch failed: {}", e)))?;
        let mut sessions = Vec::with_capacity(ids.len());
        for id in ids {
            sessions.push(state.sessions().get(id).await?);
        }
        return Ok(Json(sessions).into_response());
    }

    Ok((StatusCode::ACCEPTED, Json(UploadAccepted { accepted, lfl_number })).into_response())
}

/// GET /api/v1/sessions
async fn list_sessions(State(state): State<AppState>) -> Json<Vec<UploadSession>> {
    Json(state.sessions().list().await)
}

/// GET /api/v1/sessions/history
async fn history(State(state): State<AppState>) -> Json<Vec<HistoryRow>> {
    Json(history_view(&state.sessions().list().await))
}

/// GET /api/v1/sessions/events
///
/// Emits the current revision once, then again on every change.
async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let rx = state.notifier().subscribe();
    let current = *rx.borrow();

    let changes = stream::unfold(rx, |mut rx| async move {
        rx.changed().await.ok()?;
        let revision = *rx.borrow_and_update();
        Some((revision, rx))
    });

    let stream = stream::once(async move { current })
        .chain(changes)
        .map(|revision| Ok(Event::default().event("revision").data(revision.to_string())));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /api/v1/sessions/books.json
async fn download_sessions(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let json = export_json(&state.sessions().list().await)?;
    Ok(json_download(json))
}

/// GET /api/v1/sessions/:session_id
async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<UploadSession>> {
    Ok(Json(state.sessions().get_by_str(&session_id).await?))
}

/// GET /api/v1/sessions/:session_id/preview
async fn get_preview(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Response> {
    let session = state.sessions().get_by_str(&session_id).await?;
    let preview = state
        .pipeline()
        .previews()
        .get(session.id)
        .await
        .ok_or_else(|| AppError::Pipeline(PipelineError::SessionNotFound(format!("{} (preview)", session.id))))?;

    Ok(([(header::CONTENT_TYPE, preview.content_type)], preview.data).into_response())
}
