use chrono::{Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use tripline_core::email;
use tripline_core::error::{WorkflowError, WorkflowResult};
use tripline_core::repository::{TokenRepository, TripRepository};
use tripline_core::token::{DriverToken, InvalidationReason};
use tripline_core::trip::TripStatus;

/// Authorization links are valid for three days from issuance.
pub const TOKEN_TTL_DAYS: i64 = 3;

const TOKEN_LENGTH: usize = 32;

/// Successful validation of a driver token against the live trip row.
#[derive(Debug, Clone)]
pub struct TokenValidation {
    pub token_id: Uuid,
    pub driver_email: String,
    pub trip_status: TripStatus,
    pub token_used: bool,
    /// The holder may accept/reject only while the trip is still awaiting a
    /// response and the token has not been consumed.
    pub can_act: bool,
}

/// Read-only probe used before rendering the driver-facing page. Validation
/// failures become a message instead of an error so the UI can explain what
/// to do next.
#[derive(Debug, Clone, Serialize)]
pub struct TokenProbe {
    pub driver_email: Option<String>,
    pub trip_status: Option<TripStatus>,
    pub token_used: bool,
    pub can_take_action: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Issues, reuses, invalidates, validates and consumes driver authorization
/// tokens. At most one token per (trip, driver) is live at a time, enforced
/// by invalidate-before-mint rather than a uniqueness constraint.
pub struct TokenManager {
    tokens: Arc<dyn TokenRepository>,
    trips: Arc<dyn TripRepository>,
    ttl: Duration,
}

impl TokenManager {
    pub fn new(tokens: Arc<dyn TokenRepository>, trips: Arc<dyn TripRepository>) -> Self {
        Self::with_ttl_days(tokens, trips, TOKEN_TTL_DAYS)
    }

    pub fn with_ttl_days(
        tokens: Arc<dyn TokenRepository>,
        trips: Arc<dyn TripRepository>,
        ttl_days: i64,
    ) -> Self {
        Self {
            tokens,
            trips,
            ttl: Duration::days(ttl_days),
        }
    }

    /// Return the live unexpired token for the pair unchanged (re-notifying
    /// must not burn a new secret), replace expired live tokens, or mint a
    /// fresh one.
    pub async fn issue_or_reuse(
        &self,
        trip_id: Uuid,
        driver_email: &str,
    ) -> WorkflowResult<DriverToken> {
        let driver_email = email::normalize(driver_email);
        let now = Utc::now();

        let existing = self.tokens.tokens_for_driver(trip_id, &driver_email).await?;
        let open: Vec<&DriverToken> = existing
            .iter()
            .filter(|t| !t.used && t.invalidated_at.is_none())
            .collect();

        if let Some(live) = open.iter().rev().find(|t| !t.is_expired(now)) {
            tracing::debug!(trip_id = %trip_id, "Reusing live driver token");
            return Ok((*live).clone());
        }

        if !open.is_empty() {
            // Every open token has lapsed; stamp them before minting so only
            // one token is ever live for the pair.
            self.tokens
                .invalidate_live(
                    trip_id,
                    &driver_email,
                    InvalidationReason::ReplacedByNewToken,
                    now,
                )
                .await?;
        }

        let token = DriverToken::new(trip_id, driver_email, mint_token_value(), self.ttl);
        self.tokens.insert_token(&token).await?;
        tracing::info!(trip_id = %trip_id, token_id = %token.id, "Issued driver token");
        Ok(token)
    }

    /// Stamp all live tokens for the pair. Must run before minting a token
    /// for a different driver so two "current" drivers never hold live links
    /// at once.
    pub async fn invalidate(
        &self,
        trip_id: Uuid,
        driver_email: &str,
        reason: InvalidationReason,
    ) -> WorkflowResult<u64> {
        let driver_email = email::normalize(driver_email);
        let stamped = self
            .tokens
            .invalidate_live(trip_id, &driver_email, reason, Utc::now())
            .await?;
        if stamped > 0 {
            tracing::info!(trip_id = %trip_id, reason = %reason, count = stamped, "Invalidated driver tokens");
        }
        Ok(stamped)
    }

    /// Check a presented token value against its row and the live trip.
    ///
    /// Order matters for the user-facing message: missing, used, invalidated
    /// and expired each surface distinctly. On top of the row checks the
    /// token's driver must still equal the trip's current driver; the live
    /// trip row wins when a reassignment raced ahead of the invalidation
    /// write.
    pub async fn validate(
        &self,
        trip_id: Uuid,
        token_value: &str,
    ) -> WorkflowResult<TokenValidation> {
        let token = self
            .tokens
            .find_token(trip_id, token_value)
            .await?
            .ok_or_else(|| WorkflowError::NotFound("Authorization link".to_string()))?;

        if token.used {
            return Err(WorkflowError::TokenUsed);
        }
        if token.invalidated_at.is_some() {
            let reason = token
                .invalidation_reason
                .unwrap_or(InvalidationReason::ReplacedByNewToken);
            return Err(WorkflowError::TokenInvalidated(reason));
        }
        if token.is_expired(Utc::now()) {
            return Err(WorkflowError::TokenExpired);
        }

        let trip = self
            .trips
            .get_trip(trip_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("Trip {}", trip_id)))?;

        if trip.driver.as_deref() != Some(token.driver_email.as_str()) {
            return Err(WorkflowError::TokenInvalidated(
                InvalidationReason::DriverChanged,
            ));
        }

        let can_act = trip.status == TripStatus::Pending && !token.used;
        Ok(TokenValidation {
            token_id: token.id,
            driver_email: token.driver_email,
            trip_status: trip.status,
            token_used: token.used,
            can_act,
        })
    }

    /// Consume the token exactly once. The repository applies the
    /// `used = false -> true` compare-and-set, so of two concurrent calls
    /// one wins and the other sees `TokenUsed`.
    pub async fn consume(&self, token_id: Uuid) -> WorkflowResult<()> {
        let won = self.tokens.consume(token_id, Utc::now()).await?;
        if !won {
            return Err(WorkflowError::TokenUsed);
        }
        Ok(())
    }

    /// Non-failing validation for the driver-facing UI.
    pub async fn probe(&self, trip_id: Uuid, token_value: &str) -> WorkflowResult<TokenProbe> {
        match self.validate(trip_id, token_value).await {
            Ok(validation) => {
                let message = if validation.can_act {
                    None
                } else {
                    Some("This trip is no longer awaiting a response.".to_string())
                };
                Ok(TokenProbe {
                    driver_email: Some(validation.driver_email),
                    trip_status: Some(validation.trip_status),
                    token_used: validation.token_used,
                    can_take_action: validation.can_act,
                    message,
                })
            }
            Err(
                err @ (WorkflowError::NotFound(_)
                | WorkflowError::TokenUsed
                | WorkflowError::TokenExpired
                | WorkflowError::TokenInvalidated(_)),
            ) => Ok(TokenProbe {
                driver_email: None,
                trip_status: None,
                token_used: matches!(err, WorkflowError::TokenUsed),
                can_take_action: false,
                message: Some(err.to_string()),
            }),
            // Store failures stay fatal.
            Err(other) => Err(other),
        }
    }
}

fn mint_token_value() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}
