use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use tripline_core::error::StoreError;
use tripline_core::repository::TripRepository;
use tripline_core::trip::{DriverChange, Trip, TripStatus};
use tripline_shared::models::events::TripChangedEvent;

use crate::feed::TripFeed;

pub struct PgTripRepository {
    pool: PgPool,
    feed: TripFeed,
}

impl PgTripRepository {
    pub fn new(pool: PgPool, feed: TripFeed) -> Self {
        Self { pool, feed }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct TripRow {
    id: Uuid,
    owner_id: String,
    status: String,
    driver: Option<String>,
    version: i64,
    pickup_at: Option<DateTime<Utc>>,
    pickup_location: Option<String>,
    dropoff_location: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TripRow {
    fn into_trip(self) -> Result<Trip, StoreError> {
        let status = TripStatus::parse(&self.status)
            .ok_or_else(|| StoreError::decode(format!("unknown trip status {}", self.status)))?;
        Ok(Trip {
            id: self.id,
            owner_id: self.owner_id,
            status,
            driver: self.driver,
            version: self.version,
            pickup_at: self.pickup_at,
            pickup_location: self.pickup_location,
            dropoff_location: self.dropoff_location,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const TRIP_COLUMNS: &str =
    "id, owner_id, status, driver, version, pickup_at, pickup_location, dropoff_location, created_at, updated_at";

#[async_trait]
impl TripRepository for PgTripRepository {
    async fn insert_trip(&self, trip: &Trip) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO trips (id, owner_id, status, driver, version, pickup_at, pickup_location, dropoff_location, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(trip.id)
        .bind(&trip.owner_id)
        .bind(trip.status.as_str())
        .bind(&trip.driver)
        .bind(trip.version)
        .bind(trip.pickup_at)
        .bind(&trip.pickup_location)
        .bind(&trip.dropoff_location)
        .bind(trip.created_at)
        .bind(trip.updated_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::database)?;
        Ok(())
    }

    async fn get_trip(&self, id: Uuid) -> Result<Option<Trip>, StoreError> {
        let row = sqlx::query_as::<_, TripRow>(&format!(
            "SELECT {} FROM trips WHERE id = $1",
            TRIP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::database)?;

        row.map(TripRow::into_trip).transpose()
    }

    async fn apply_transition(
        &self,
        id: Uuid,
        expected: TripStatus,
        next: TripStatus,
        driver: DriverChange,
    ) -> Result<Option<Trip>, StoreError> {
        // One conditional statement: the WHERE clause on the current status
        // is the compare-and-set.
        let row = match driver {
            DriverChange::Keep => {
                sqlx::query_as::<_, TripRow>(&format!(
                    "UPDATE trips SET status = $1, version = version + 1, updated_at = NOW() \
                     WHERE id = $2 AND status = $3 RETURNING {}",
                    TRIP_COLUMNS
                ))
                .bind(next.as_str())
                .bind(id)
                .bind(expected.as_str())
                .fetch_optional(&self.pool)
                .await
            }
            DriverChange::Clear => {
                sqlx::query_as::<_, TripRow>(&format!(
                    "UPDATE trips SET status = $1, driver = NULL, version = version + 1, updated_at = NOW() \
                     WHERE id = $2 AND status = $3 RETURNING {}",
                    TRIP_COLUMNS
                ))
                .bind(next.as_str())
                .bind(id)
                .bind(expected.as_str())
                .fetch_optional(&self.pool)
                .await
            }
            DriverChange::Assign(email) => {
                sqlx::query_as::<_, TripRow>(&format!(
                    "UPDATE trips SET status = $1, driver = $4, version = version + 1, updated_at = NOW() \
                     WHERE id = $2 AND status = $3 RETURNING {}",
                    TRIP_COLUMNS
                ))
                .bind(next.as_str())
                .bind(id)
                .bind(expected.as_str())
                .bind(email)
                .fetch_optional(&self.pool)
                .await
            }
        }
        .map_err(StoreError::database)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let trip = row.into_trip()?;

        self.feed.publish(TripChangedEvent {
            trip_id: trip.id,
            status: trip.status.as_str().to_string(),
            driver: trip.driver.clone(),
            version: trip.version,
            occurred_at: trip.updated_at.timestamp(),
        });
        Ok(Some(trip))
    }
}
