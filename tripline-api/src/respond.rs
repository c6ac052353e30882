use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tripline_core::trip::TripStatus;
use tripline_workflow::coordinator::Decision;
use tripline_workflow::token::TokenProbe;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    pub token: String,
    pub decision: Decision,
}

#[derive(Debug, Serialize)]
pub struct RespondResponse {
    pub trip_id: Uuid,
    pub status: TripStatus,
    pub warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct LegacyConfirmRequest {
    pub driver_email: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/trips/:id/respond
/// Token-authenticated accept/reject; no login required
pub async fn respond(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Json(req): Json<RespondRequest>,
) -> Result<Json<RespondResponse>, AppError> {
    let outcome = state
        .coordinator
        .respond(trip_id, &req.token, req.decision)
        .await?;

    Ok(Json(RespondResponse {
        trip_id,
        status: outcome.trip.status,
        warnings: outcome.warnings,
    }))
}

/// GET /v1/trips/:id/tokens/:token
/// Read-only probe used before rendering the driver-facing page
pub async fn probe_token(
    State(state): State<AppState>,
    Path((trip_id, token)): Path<(Uuid, String)>,
) -> Result<Json<TokenProbe>, AppError> {
    let probe = state.tokens.probe(trip_id, &token).await?;
    Ok(Json(probe))
}

/// POST /v1/trips/:id/confirm
/// Legacy email-authenticated confirmation; weaker trust than the token path
pub async fn legacy_confirm(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Json(req): Json<LegacyConfirmRequest>,
) -> Result<Json<RespondResponse>, AppError> {
    let trip = state
        .coordinator
        .legacy_confirm(trip_id, &req.driver_email)
        .await?;

    Ok(Json(RespondResponse {
        trip_id,
        status: trip.status,
        warnings: Vec::new(),
    }))
}
