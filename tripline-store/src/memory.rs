use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use tripline_core::error::StoreError;
use tripline_core::quote::Quote;
use tripline_core::repository::{QuoteRepository, TokenRepository, TripRepository};
use tripline_core::token::{DriverToken, InvalidationReason};
use tripline_core::trip::{DriverChange, Trip, TripStatus};
use tripline_shared::models::events::TripChangedEvent;

use crate::feed::TripFeed;

/// Hash-map backed implementation of all three repositories. Carries the
/// same conditional-update semantics as the Postgres store: the guarded
/// sections are the compare-and-set.
pub struct MemoryStore {
    trips: Mutex<HashMap<Uuid, Trip>>,
    tokens: Mutex<HashMap<Uuid, DriverToken>>,
    quotes: Mutex<HashMap<(Uuid, String), Quote>>,
    feed: TripFeed,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            trips: Mutex::new(HashMap::new()),
            tokens: Mutex::new(HashMap::new()),
            quotes: Mutex::new(HashMap::new()),
            feed: TripFeed::default(),
        }
    }

    pub fn feed(&self) -> &TripFeed {
        &self.feed
    }

    fn lock_poisoned() -> StoreError {
        StoreError::Database("store lock poisoned".to_string())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TripRepository for MemoryStore {
    async fn insert_trip(&self, trip: &Trip) -> Result<(), StoreError> {
        let mut trips = self.trips.lock().map_err(|_| Self::lock_poisoned())?;
        trips.insert(trip.id, trip.clone());
        Ok(())
    }

    async fn get_trip(&self, id: Uuid) -> Result<Option<Trip>, StoreError> {
        let trips = self.trips.lock().map_err(|_| Self::lock_poisoned())?;
        Ok(trips.get(&id).cloned())
    }

    async fn apply_transition(
        &self,
        id: Uuid,
        expected: TripStatus,
        next: TripStatus,
        driver: DriverChange,
    ) -> Result<Option<Trip>, StoreError> {
        let updated = {
            let mut trips = self.trips.lock().map_err(|_| Self::lock_poisoned())?;
            let Some(trip) = trips.get_mut(&id) else {
                return Ok(None);
            };
            if trip.status != expected {
                return Ok(None);
            }
            trip.status = next;
            match driver {
                DriverChange::Keep => {}
                DriverChange::Clear => trip.driver = None,
                DriverChange::Assign(email) => trip.driver = Some(email),
            }
            trip.version += 1;
            trip.updated_at = Utc::now();
            trip.clone()
        };

        self.feed.publish(TripChangedEvent {
            trip_id: updated.id,
            status: updated.status.as_str().to_string(),
            driver: updated.driver.clone(),
            version: updated.version,
            occurred_at: updated.updated_at.timestamp(),
        });
        Ok(Some(updated))
    }
}

#[async_trait]
impl TokenRepository for MemoryStore {
    async fn insert_token(&self, token: &DriverToken) -> Result<(), StoreError> {
        let mut tokens = self.tokens.lock().map_err(|_| Self::lock_poisoned())?;
        tokens.insert(token.id, token.clone());
        Ok(())
    }

    async fn find_token(
        &self,
        trip_id: Uuid,
        token_value: &str,
    ) -> Result<Option<DriverToken>, StoreError> {
        let tokens = self.tokens.lock().map_err(|_| Self::lock_poisoned())?;
        Ok(tokens
            .values()
            .find(|t| t.trip_id == trip_id && t.token == token_value)
            .cloned())
    }

    async fn tokens_for_driver(
        &self,
        trip_id: Uuid,
        driver_email: &str,
    ) -> Result<Vec<DriverToken>, StoreError> {
        let tokens = self.tokens.lock().map_err(|_| Self::lock_poisoned())?;
        let mut rows: Vec<DriverToken> = tokens
            .values()
            .filter(|t| t.trip_id == trip_id && t.driver_email == driver_email)
            .cloned()
            .collect();
        rows.sort_by_key(|t| t.created_at);
        Ok(rows)
    }

    async fn invalidate_live(
        &self,
        trip_id: Uuid,
        driver_email: &str,
        reason: InvalidationReason,
        at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut tokens = self.tokens.lock().map_err(|_| Self::lock_poisoned())?;
        let mut stamped = 0;
        for token in tokens.values_mut() {
            if token.trip_id == trip_id
                && token.driver_email == driver_email
                && !token.used
                && token.invalidated_at.is_none()
            {
                token.invalidated_at = Some(at);
                token.invalidation_reason = Some(reason);
                stamped += 1;
            }
        }
        Ok(stamped)
    }

    async fn consume(&self, token_id: Uuid, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut tokens = self.tokens.lock().map_err(|_| Self::lock_poisoned())?;
        let Some(token) = tokens.get_mut(&token_id) else {
            return Ok(false);
        };
        if token.used {
            return Ok(false);
        }
        token.used = true;
        token.used_at = Some(at);
        Ok(true)
    }
}

#[async_trait]
impl QuoteRepository for MemoryStore {
    async fn upsert_quote(&self, quote: &Quote) -> Result<Quote, StoreError> {
        let mut quotes = self.quotes.lock().map_err(|_| Self::lock_poisoned())?;
        let key = (quote.trip_id, quote.driver_email.clone());
        let stored = match quotes.get_mut(&key) {
            Some(existing) => {
                existing.price = quote.price;
                existing.currency = quote.currency.clone();
                existing.submitted_at = quote.submitted_at;
                existing.clone()
            }
            None => {
                quotes.insert(key, quote.clone());
                quote.clone()
            }
        };
        Ok(stored)
    }

    async fn quotes_for_trip(&self, trip_id: Uuid) -> Result<Vec<Quote>, StoreError> {
        let quotes = self.quotes.lock().map_err(|_| Self::lock_poisoned())?;
        let mut rows: Vec<Quote> = quotes
            .values()
            .filter(|q| q.trip_id == trip_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(rows)
    }

    async fn quote_for_driver(
        &self,
        trip_id: Uuid,
        driver_email: &str,
    ) -> Result<Option<Quote>, StoreError> {
        let quotes = self.quotes.lock().map_err(|_| Self::lock_poisoned())?;
        Ok(quotes.get(&(trip_id, driver_email.to_string())).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_apply_transition_is_conditional() {
        let store = MemoryStore::new();
        let trip = Trip::new("owner-1".to_string());
        store.insert_trip(&trip).await.unwrap();

        // Expected status does not match: no write.
        let missed = store
            .apply_transition(
                trip.id,
                TripStatus::Pending,
                TripStatus::Confirmed,
                DriverChange::Keep,
            )
            .await
            .unwrap();
        assert!(missed.is_none());

        let updated = store
            .apply_transition(
                trip.id,
                TripStatus::NotConfirmed,
                TripStatus::Pending,
                DriverChange::Assign("d@x.com".to_string()),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, TripStatus::Pending);
        assert_eq!(updated.version, trip.version + 1);
    }

    #[tokio::test]
    async fn test_transition_publishes_feed_event() {
        let store = MemoryStore::new();
        let trip = Trip::new("owner-1".to_string());
        store.insert_trip(&trip).await.unwrap();

        let mut rx = store.feed().subscribe();
        store
            .apply_transition(
                trip.id,
                TripStatus::NotConfirmed,
                TripStatus::Pending,
                DriverChange::Assign("d@x.com".to_string()),
            )
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.trip_id, trip.id);
        assert_eq!(event.status, "PENDING");
        assert_eq!(event.driver.as_deref(), Some("d@x.com"));
    }

    #[tokio::test]
    async fn test_consume_is_single_shot() {
        let store = MemoryStore::new();
        let token = DriverToken::new(
            Uuid::new_v4(),
            "d@x.com".to_string(),
            "tok".to_string(),
            chrono::Duration::days(3),
        );
        store.insert_token(&token).await.unwrap();

        assert!(store.consume(token.id, Utc::now()).await.unwrap());
        assert!(!store.consume(token.id, Utc::now()).await.unwrap());
    }
}
