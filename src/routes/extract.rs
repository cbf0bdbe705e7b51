//! Text extraction routes
//!
//! Runs the book extractor over text the client already has, e.g. OCR
//! output from another tool.

use axum::{routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::extract::{parse_ocr_text, BookRecord};
use crate::state::AppState;

/// Create the extract router
pub fn router() -> Router<AppState> {
    Router::new().route("/text", post(extract_text))
}

#[derive(Debug, Deserialize)]
pub struct ExtractTextRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ExtractTextResponse {
    pub count: usize,
    pub books: Vec<BookRecord>,
}

/// POST /api/v1/extract/text
async fn extract_text(Json(request): Json<ExtractTextRequest>) -> Json<ExtractTextResponse> {
    let books = parse_ocr_text(&request.text);
    Json(ExtractTextResponse {
        count: books.len(),
        books,
    })
}
