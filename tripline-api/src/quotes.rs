use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tripline_core::error::WorkflowError;
use tripline_core::quote::Quote;
use tripline_shared::pii::Masked;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SubmitQuoteRequest {
    /// Either a bare driver email or a magic-link token identifies the
    /// submitting driver.
    pub driver_email: Option<String>,
    pub token: Option<String>,
    pub price: f64,
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub driver_email: Masked<String>,
    pub price: f64,
    pub currency: String,
    pub submitted_at: DateTime<Utc>,
}

impl From<Quote> for QuoteResponse {
    fn from(quote: Quote) -> Self {
        Self {
            id: quote.id,
            trip_id: quote.trip_id,
            driver_email: Masked(quote.driver_email),
            price: quote.price,
            currency: quote.currency,
            submitted_at: quote.submitted_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuotesParams {
    pub driver_email: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/trips/:id/quotes
/// Submit or update a price quote for the trip
pub async fn submit_quote(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Json(req): Json<SubmitQuoteRequest>,
) -> Result<Json<QuoteResponse>, AppError> {
    // 1. Resolve the submitting driver: a token wins over a bare email.
    let driver_email = match (&req.token, &req.driver_email) {
        (Some(token), _) => state.tokens.validate(trip_id, token).await?.driver_email,
        (None, Some(email)) => email.clone(),
        (None, None) => {
            return Err(AppError(WorkflowError::Validation(
                "Either driver_email or token is required".to_string(),
            )))
        }
    };

    // 2. Validate and upsert through the registry.
    let quote = state
        .quotes
        .submit(trip_id, &driver_email, req.price, req.currency.as_str())
        .await?;

    Ok(Json(quote.into()))
}

/// GET /v1/trips/:id/quotes
/// Owner view (bearer credential): all quotes, newest first.
/// Driver view (?driver_email=...): restricted to the driver's own row.
pub async fn list_quotes(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Query(params): Query<ListQuotesParams>,
    headers: HeaderMap,
) -> Result<Json<Vec<QuoteResponse>>, AppError> {
    if let Some(driver_email) = params.driver_email.as_deref() {
        let quotes = state.quotes.list_for(trip_id, Some(driver_email)).await?;
        return Ok(Json(quotes.into_iter().map(Into::into).collect()));
    }

    // No driver filter: this is the owner view, so the caller must prove
    // ownership.
    let bearer = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(WorkflowError::Unauthorized)?;
    let identity = state.verifier.verify(bearer).await?;

    let trip = state
        .trips
        .get_trip(trip_id)
        .await
        .map_err(WorkflowError::from)?
        .ok_or_else(|| WorkflowError::NotFound(format!("Trip {}", trip_id)))?;
    if trip.owner_id != identity.id {
        return Err(AppError(WorkflowError::Forbidden(
            "Only the trip owner can list all quotes".to_string(),
        )));
    }

    let quotes = state.quotes.list_for(trip_id, None).await?;
    Ok(Json(quotes.into_iter().map(Into::into).collect()))
}
