//! Health check endpoints

use axum::{extract::State, Json};
use serde::Serialize;

use crate::ocr::OcrProvider;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
    pub variant: &'static str,
    pub ocr_providers: Vec<OcrProvider>,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: "shelfscan-server",
        variant: match state.variant() {
            crate::config::Variant::Basic => "basic",
            crate::config::Variant::Registered => "registered",
        },
        ocr_providers: state.config().ocr.providers.clone(),
    })
}
