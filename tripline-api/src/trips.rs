use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tripline_core::error::WorkflowError;
use tripline_core::identity::Identity;
use tripline_core::trip::{Trip, TripStatus};
use tripline_shared::pii::Masked;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateTripRequest {
    pub pickup_at: Option<DateTime<Utc>>,
    pub pickup_location: Option<String>,
    pub dropoff_location: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TripResponse {
    pub id: Uuid,
    pub owner_id: String,
    pub status: TripStatus,
    pub driver: Option<Masked<String>>,
    pub version: i64,
    pub pickup_at: Option<DateTime<Utc>>,
    pub pickup_location: Option<String>,
    pub dropoff_location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Trip> for TripResponse {
    fn from(trip: Trip) -> Self {
        Self {
            id: trip.id,
            owner_id: trip.owner_id,
            status: trip.status,
            driver: trip.driver.map(Masked),
            version: trip.version,
            pickup_at: trip.pickup_at,
            pickup_location: trip.pickup_location,
            dropoff_location: trip.dropoff_location,
            created_at: trip.created_at,
            updated_at: trip.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AssignDriverRequest {
    pub driver_email: String,
}

#[derive(Debug, Serialize)]
pub struct AssignDriverResponse {
    pub trip: TripResponse,
    pub token_expires_at: DateTime<Utc>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CancelTripResponse {
    pub trip: TripResponse,
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ResendLinkResponse {
    pub token_expires_at: DateTime<Utc>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/trips
/// Create a trip owned by the authenticated operator
pub async fn create_trip(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CreateTripRequest>,
) -> Result<(StatusCode, Json<TripResponse>), AppError> {
    let mut trip = Trip::new(identity.id);
    trip.pickup_at = req.pickup_at;
    trip.pickup_location = req.pickup_location;
    trip.dropoff_location = req.dropoff_location;

    state
        .trips
        .insert_trip(&trip)
        .await
        .map_err(WorkflowError::from)?;

    tracing::info!(trip_id = %trip.id, "Trip created");
    Ok((StatusCode::CREATED, Json(trip.into())))
}

/// GET /v1/trips/:id
/// Retrieve a trip (owner view)
pub async fn get_trip(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TripResponse>, AppError> {
    let trip = state
        .trips
        .get_trip(trip_id)
        .await
        .map_err(WorkflowError::from)?
        .ok_or_else(|| WorkflowError::NotFound(format!("Trip {}", trip_id)))?;

    if trip.owner_id != identity.id {
        return Err(AppError(WorkflowError::Forbidden(
            "Only the trip owner can view this trip".to_string(),
        )));
    }

    Ok(Json(trip.into()))
}

/// POST /v1/trips/:id/assign
/// Assign or reassign a driver; sends the magic link
pub async fn assign_driver(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(trip_id): Path<Uuid>,
    Json(req): Json<AssignDriverRequest>,
) -> Result<Json<AssignDriverResponse>, AppError> {
    let outcome = state
        .coordinator
        .assign_driver(trip_id, &req.driver_email, &identity)
        .await?;

    Ok(Json(AssignDriverResponse {
        trip: outcome.trip.into(),
        token_expires_at: outcome.token.expires_at,
        warnings: outcome.warnings,
    }))
}

/// POST /v1/trips/:id/cancel
/// Cancel the trip, defusing any outstanding driver links
pub async fn cancel_trip(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<CancelTripResponse>, AppError> {
    let outcome = state.coordinator.cancel_trip(trip_id, &identity).await?;

    Ok(Json(CancelTripResponse {
        trip: outcome.trip.into(),
        warnings: outcome.warnings,
    }))
}

/// POST /v1/trips/:id/resend-link
/// Re-send the assignment link; delivery failure fails the call
pub async fn resend_link(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<ResendLinkResponse>, AppError> {
    let outcome = state.coordinator.resend_link(trip_id, &identity).await?;

    Ok(Json(ResendLinkResponse {
        token_expires_at: outcome.token.expires_at,
    }))
}
