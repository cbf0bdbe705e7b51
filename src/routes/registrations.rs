//! Registration Routes
//!
//! LFL number registration through an email code challenge.
//!
//! Endpoints:
//! - GET /api/v1/registrations - List registrations and the active number
//! - POST /api/v1/registrations/request-code - Issue a verification code
//! - POST /api/v1/registrations/verify - Submit the code
//! - PUT /api/v1/registrations/active - Change the active number

use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::registration::{Registration, RegistrationService, VerificationError};
use crate::state::AppState;

/// Create the registrations router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_registrations))
        .route("/request-code", post(request_code))
        .route("/verify", post(verify_code))
        .route("/active", put(select_active))
}

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RequestCodeRequest {
    pub number: String,
    pub email: String,
}

/// The issued code is returned in the response; nothing is emailed
#[derive(Debug, Serialize)]
pub struct RequestCodeResponse {
    pub number: String,
    pub email: String,
    pub code: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct SelectActiveRequest {
    /// Empty string clears the selection
    #[serde(default)]
    pub number: String,
}

/// Pending challenge without its code
#[derive(Debug, Serialize)]
pub struct PendingSummary {
    pub number: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationsResponse {
    pub registrations: Vec<Registration>,
    pub active_lfl_number: Option<String>,
    pub pending: Option<PendingSummary>,
}

impl RegistrationsResponse {
    fn from_service(service: &RegistrationService) -> Self {
        Self {
            registrations: service.registrations().to_vec(),
            active_lfl_number: service.active().map(str::to_string),
            pending: service.pending().map(|p| PendingSummary {
                number: p.number.clone(),
                email: p.email.clone(),
            }),
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/registrations
async fn list_registrations(State(state): State<AppState>) -> Json<RegistrationsResponse> {
    let registrations = state.registrations().lock();
    Json(RegistrationsResponse::from_service(&registrations))
}

/// POST /api/v1/registrations/request-code
async fn request_code(
    State(state): State<AppState>,
    Json(request): Json<RequestCodeRequest>,
) -> Result<Json<RequestCodeResponse>> {
    let pending = state
        .registrations()
        .lock()
        .request_code(&request.number, &request.email)?;

    Ok(Json(RequestCodeResponse {
        message: format!(
            "Verification code for {} generated. Email delivery is not available; enter the code shown here.",
            pending.email
        ),
        number: pending.number,
        email: pending.email,
        code: pending.code,
    }))
}

/// POST /api/v1/registrations/verify
async fn verify_code(
    State(state): State<AppState>,
    Json(request): Json<VerifyCodeRequest>,
) -> Result<Json<RegistrationsResponse>> {
    let response = state
        .with_registrations(move |registrations| {
            registrations.verify_code(&request.code)?;
            Ok::<_, VerificationError>(RegistrationsResponse::from_service(registrations))
        })
        .await??;

    state.notifier().bump();
    Ok(Json(response))
}

/// PUT /api/v1/registrations/active
async fn select_active(
    State(state): State<AppState>,
    Json(request): Json<SelectActiveRequest>,
) -> Result<Json<RegistrationsResponse>> {
    state.select_active(&request.number).await?;

    let registrations = state.registrations().lock();
    Ok(Json(RegistrationsResponse::from_service(&registrations)))
}
