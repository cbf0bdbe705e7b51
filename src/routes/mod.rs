//! Route modules for Shelfscan Server

pub mod extract;
pub mod health;
pub mod ocr;
pub mod registrations;
pub mod sessions;

use axum::{
    extract::{Multipart, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::config::Variant;
use crate::error::{AppError, Result};
use crate::session::UploadFile;
use crate::state::AppState;
use crate::view::{StatusView, EXPORT_FILE_NAME};

/// Build the API router for the configured variant
pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health::health_check))
        .route("/api/v1/health", get(health::health_check))
        .nest("/api/v1/extract", extract::router())
        .route("/api/v1/status", get(status));

    router = match state.variant() {
        Variant::Basic => router.nest("/api/v1/ocr", ocr::router()),
        Variant::Registered => router
            .nest("/api/v1/registrations", registrations::router())
            .nest("/api/v1/sessions", sessions::router()),
    };

    router.with_state(state)
}

#[derive(Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub status: StatusView,
    pub revision: u64,
}

/// GET /api/v1/status
async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: state.pipeline().indicator().snapshot(),
        revision: state.notifier().revision(),
    })
}

/// Collect every file field of a multipart form
pub(crate) async fn read_upload_files(mut multipart: Multipart) -> Result<Vec<UploadFile>> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read {}: {}", name, e)))?;

        let mut file = UploadFile::new(name, data);
        if let Some(content_type) = content_type {
            file = file.with_content_type(content_type);
        }
        files.push(file);
    }

    Ok(files)
}

/// Serve JSON as a `books.json` attachment
pub(crate) fn json_download(json: String) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
            ),
        ],
        json,
    )
}
