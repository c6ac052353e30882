use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Why a token stopped being actionable before it was used.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvalidationReason {
    ReplacedByNewToken,
    DriverChanged,
    TripCancelled,
}

impl InvalidationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            InvalidationReason::ReplacedByNewToken => "REPLACED_BY_NEW_TOKEN",
            InvalidationReason::DriverChanged => "DRIVER_CHANGED",
            InvalidationReason::TripCancelled => "TRIP_CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Option<InvalidationReason> {
        match value {
            "REPLACED_BY_NEW_TOKEN" => Some(InvalidationReason::ReplacedByNewToken),
            "DRIVER_CHANGED" => Some(InvalidationReason::DriverChanged),
            "TRIP_CANCELLED" => Some(InvalidationReason::TripCancelled),
            _ => None,
        }
    }

    /// Each reason maps to a different recommended next action for the
    /// driver, so the messages are never collapsed into one.
    pub fn user_message(self) -> &'static str {
        match self {
            InvalidationReason::ReplacedByNewToken => {
                "This link has been replaced by a newer one. Please use the most recent email."
            }
            InvalidationReason::DriverChanged => {
                "A different driver has been assigned to this trip. Please contact the trip owner."
            }
            InvalidationReason::TripCancelled => "This trip has been cancelled.",
        }
    }
}

impl fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single-use, time-limited capability granting an unauthenticated holder
/// the right to accept or reject one specific trip assignment.
///
/// Rows are never deleted; used and invalidated tokens stay behind as an
/// audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverToken {
    pub id: Uuid,
    pub trip_id: Uuid,
    /// Normalized (trimmed, lower-cased) at creation.
    pub driver_email: String,
    /// High-entropy opaque secret embedded in the magic link.
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub invalidated_at: Option<DateTime<Utc>>,
    pub invalidation_reason: Option<InvalidationReason>,
    pub created_at: DateTime<Utc>,
}

impl DriverToken {
    pub fn new(trip_id: Uuid, driver_email: String, token: String, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            trip_id,
            driver_email,
            token,
            expires_at: now + ttl,
            used: false,
            used_at: None,
            invalidated_at: None,
            invalidation_reason: None,
            created_at: now,
        }
    }

    /// Live means unused, not invalidated and unexpired.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        !self.used && self.invalidated_at.is_none() && !self.is_expired(now)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_token_is_live() {
        let token = DriverToken::new(
            Uuid::new_v4(),
            "driver@example.com".to_string(),
            "abc123".to_string(),
            Duration::days(3),
        );
        assert!(token.is_live(Utc::now()));
        assert!(!token.is_expired(Utc::now()));
    }

    #[test]
    fn test_expired_token_is_not_live() {
        let mut token = DriverToken::new(
            Uuid::new_v4(),
            "driver@example.com".to_string(),
            "abc123".to_string(),
            Duration::days(3),
        );
        token.expires_at = Utc::now() - Duration::minutes(1);
        assert!(!token.is_live(Utc::now()));
        assert!(token.is_expired(Utc::now()));
    }
}
