//! Single-image OCR routes
//!
//! The basic flow: upload one image, get its books back, download them.
//! Each upload replaces the previous result.
//!
//! Endpoints:
//! - POST /api/v1/ocr - OCR one image (multipart)
//! - GET /api/v1/ocr/books - Cards for the latest result
//! - GET /api/v1/ocr/cards.html - Same cards as an HTML fragment
//! - GET /api/v1/ocr/books.json - Download the latest result

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};

use super::{json_download, read_upload_files};
use crate::error::{AppError, Result};
use crate::extract::BookRecord;
use crate::session::{validate_upload, PipelineError, MAX_IMAGE_SIZE};
use crate::state::AppState;
use crate::view::{cards_view, export_json, render_cards_html, CardsView};

/// Create the OCR router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(run_ocr))
        .route("/books", get(latest_cards))
        .route("/cards.html", get(latest_cards_html))
        .route("/books.json", get(download_latest))
        .layer(DefaultBodyLimit::max(MAX_IMAGE_SIZE + 64 * 1024))
}

/// POST /api/v1/ocr
///
/// Only the first image in the form is used.
async fn run_ocr(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Vec<BookRecord>>> {
    let file = read_upload_files(multipart)
        .await?
        .into_iter()
        .next()
        .ok_or(AppError::Pipeline(PipelineError::NoFiles))?;
    validate_upload(&file)?;

    let books = state
        .pipeline()
        .spawn_single(file)
        .await
        .map_err(|e| AppError::Internal(format!("OCR task failed: {}", e)))??;
    Ok(Json(books))
}

/// GET /api/v1/ocr/books
async fn latest_cards(State(state): State<AppState>) -> Json<CardsView> {
    Json(cards_view(&state.pipeline().latest().await))
}

/// GET /api/v1/ocr/cards.html
async fn latest_cards_html(State(state): State<AppState>) -> Html<String> {
    Html(render_cards_html(&cards_view(&state.pipeline().latest().await)))
}

/// GET /api/v1/ocr/books.json
async fn download_latest(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let json = export_json(&state.pipeline().latest().await)?;
    Ok(json_download(json))
}
