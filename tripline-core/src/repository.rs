use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::quote::Quote;
use crate::token::{DriverToken, InvalidationReason};
use crate::trip::{DriverChange, Trip, TripStatus};

/// Repository trait for trip records.
#[async_trait]
pub trait TripRepository: Send + Sync {
    async fn insert_trip(&self, trip: &Trip) -> Result<(), StoreError>;

    async fn get_trip(&self, id: Uuid) -> Result<Option<Trip>, StoreError>;

    /// Compare-and-set on the trip's current status. Writes the new status
    /// and the driver change in one conditional update, bumps `version`, and
    /// publishes a change-feed event. Returns the updated trip, or `None`
    /// when the status no longer matches `expected` (a concurrent writer
    /// won).
    async fn apply_transition(
        &self,
        id: Uuid,
        expected: TripStatus,
        next: TripStatus,
        driver: DriverChange,
    ) -> Result<Option<Trip>, StoreError>;
}

/// Repository trait for driver authorization tokens. Rows are append-only
/// plus conditional stamping; nothing is ever deleted.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn insert_token(&self, token: &DriverToken) -> Result<(), StoreError>;

    async fn find_token(
        &self,
        trip_id: Uuid,
        token_value: &str,
    ) -> Result<Option<DriverToken>, StoreError>;

    /// All tokens ever issued for the (trip, driver) pair, oldest first.
    async fn tokens_for_driver(
        &self,
        trip_id: Uuid,
        driver_email: &str,
    ) -> Result<Vec<DriverToken>, StoreError>;

    /// Stamps every still-live token for the pair. Conditional on the row
    /// being unused and not already invalidated; returns how many rows were
    /// stamped.
    async fn invalidate_live(
        &self,
        trip_id: Uuid,
        driver_email: &str,
        reason: InvalidationReason,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError>;

    /// Compare-and-set `used = false -> true`. Returns false when the token
    /// was already consumed, so concurrent duplicates resolve to exactly one
    /// winner.
    async fn consume(&self, token_id: Uuid, at: DateTime<Utc>) -> Result<bool, StoreError>;
}

/// Repository trait for quote rows, upserted by (trip, driver).
#[async_trait]
pub trait QuoteRepository: Send + Sync {
    async fn upsert_quote(&self, quote: &Quote) -> Result<Quote, StoreError>;

    /// All quotes for the trip, newest first.
    async fn quotes_for_trip(&self, trip_id: Uuid) -> Result<Vec<Quote>, StoreError>;

    async fn quote_for_driver(
        &self,
        trip_id: Uuid,
        driver_email: &str,
    ) -> Result<Option<Quote>, StoreError>;
}
