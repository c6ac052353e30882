use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Trip workflow status. The single source of truth for where a trip sits
/// in the owner/driver handshake.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    NotConfirmed,
    Pending,
    Confirmed,
    Rejected,
    Booked,
    Cancelled,
}

impl TripStatus {
    /// The fixed transition table. Every status change in the system is
    /// checked against this set, so no call site can apply an undeclared
    /// transition.
    pub fn allowed_transitions(self) -> &'static [TripStatus] {
        match self {
            TripStatus::NotConfirmed => &[
                TripStatus::Pending,
                TripStatus::Confirmed,
                TripStatus::Booked,
            ],
            TripStatus::Pending => &[
                TripStatus::Confirmed,
                TripStatus::Rejected,
                TripStatus::Cancelled,
                TripStatus::Booked,
            ],
            TripStatus::Confirmed => &[TripStatus::Cancelled],
            TripStatus::Booked => &[TripStatus::Cancelled],
            TripStatus::Rejected => &[TripStatus::Pending, TripStatus::NotConfirmed],
            // Terminal. A cancelled trip never comes back; a new trip must be created instead.
            TripStatus::Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, target: TripStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TripStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TripStatus::NotConfirmed => "NOT_CONFIRMED",
            TripStatus::Pending => "PENDING",
            TripStatus::Confirmed => "CONFIRMED",
            TripStatus::Rejected => "REJECTED",
            TripStatus::Booked => "BOOKED",
            TripStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Option<TripStatus> {
        match value {
            "NOT_CONFIRMED" => Some(TripStatus::NotConfirmed),
            "PENDING" => Some(TripStatus::Pending),
            "CONFIRMED" => Some(TripStatus::Confirmed),
            "REJECTED" => Some(TripStatus::Rejected),
            "BOOKED" => Some(TripStatus::Booked),
            "CANCELLED" => Some(TripStatus::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a status write touches the trip's driver column. Applied in the same
/// conditional update as the status change so the two can never diverge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverChange {
    Keep,
    Clear,
    Assign(String),
}

/// A scheduled transport engagement between an owner and (eventually) a driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub owner_id: String,
    pub status: TripStatus,
    /// Normalized email of the currently assigned responder. None means unassigned.
    pub driver: Option<String>,
    /// Bumped by every persisted status/driver change; a stale write can
    /// never silently revert a newer edit.
    pub version: i64,
    pub pickup_at: Option<DateTime<Utc>>,
    pub pickup_location: Option<String>,
    pub dropoff_location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    pub fn new(owner_id: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            status: TripStatus::NotConfirmed,
            driver: None,
            version: 1,
            pickup_at: None,
            pickup_location: None,
            dropoff_location: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_is_terminal() {
        assert!(TripStatus::Cancelled.allowed_transitions().is_empty());
        assert!(!TripStatus::Cancelled.can_transition_to(TripStatus::Cancelled));
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            TripStatus::NotConfirmed,
            TripStatus::Pending,
            TripStatus::Confirmed,
            TripStatus::Rejected,
            TripStatus::Booked,
            TripStatus::Cancelled,
        ] {
            assert_eq!(TripStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TripStatus::parse("DRAFT"), None);
    }
}
