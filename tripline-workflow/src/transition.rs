use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use tripline_core::error::{WorkflowError, WorkflowResult};
use tripline_core::repository::{TokenRepository, TripRepository};
use tripline_core::token::InvalidationReason;
use tripline_core::trip::{DriverChange, Trip, TripStatus};

/// Applies trip status changes against the fixed transition table on
/// `TripStatus`.
///
/// The engine owns state-and-persistence rules only: it never issues tokens
/// and never sends notifications, so it can be tested without any I/O
/// collaborators beyond the store.
pub struct TransitionEngine {
    trips: Arc<dyn TripRepository>,
    tokens: Arc<dyn TokenRepository>,
}

impl TransitionEngine {
    pub fn new(trips: Arc<dyn TripRepository>, tokens: Arc<dyn TokenRepository>) -> Self {
        Self { trips, tokens }
    }

    /// Transition with the default per-target side effects.
    pub async fn transition(&self, trip_id: Uuid, target: TripStatus) -> WorkflowResult<Trip> {
        self.apply(trip_id, target, None).await
    }

    /// Transition with an explicit driver change applied in the same write.
    /// Used by the coordinator where the driver column moves together with
    /// the status: assignment (driver accompanies the move to PENDING), a
    /// booking payload (driver accompanies BOOKED) and rejection (driver
    /// cleared alongside REJECTED).
    pub async fn transition_with_driver(
        &self,
        trip_id: Uuid,
        target: TripStatus,
        driver: DriverChange,
    ) -> WorkflowResult<Trip> {
        self.apply(trip_id, target, Some(driver)).await
    }

    async fn apply(
        &self,
        trip_id: Uuid,
        target: TripStatus,
        driver_override: Option<DriverChange>,
    ) -> WorkflowResult<Trip> {
        let trip = self
            .trips
            .get_trip(trip_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("Trip {}", trip_id)))?;

        if !trip.status.can_transition_to(target) {
            return Err(WorkflowError::InvalidTransition {
                from: trip.status,
                to: target,
            });
        }

        let driver_change = match driver_override {
            Some(change) => change,
            None => Self::default_driver_change(trip.status, target),
        };

        let updated = self
            .trips
            .apply_transition(trip_id, trip.status, target, driver_change)
            .await?
            .ok_or_else(|| {
                WorkflowError::Conflict(format!("Trip {} changed status concurrently", trip_id))
            })?;

        // Cancellation defuses every live link for the driver captured
        // before the write; the trip is gone for good.
        if target == TripStatus::Cancelled {
            if let Some(previous_driver) = trip.driver.as_deref() {
                let stamped = self
                    .tokens
                    .invalidate_live(
                        trip_id,
                        previous_driver,
                        InvalidationReason::TripCancelled,
                        Utc::now(),
                    )
                    .await?;
                if stamped > 0 {
                    tracing::info!(
                        trip_id = %trip_id,
                        count = stamped,
                        "Invalidated live tokens on cancellation"
                    );
                }
            }
        }

        tracing::info!(trip_id = %trip_id, from = %trip.status, to = %target, "Trip transitioned");
        Ok(updated)
    }

    /// Side effects co-located with specific transitions.
    fn default_driver_change(from: TripStatus, target: TripStatus) -> DriverChange {
        match target {
            TripStatus::Cancelled => DriverChange::Clear,
            // Legacy "unconfirm" path clears the driver.
            TripStatus::NotConfirmed
                if matches!(from, TripStatus::Confirmed | TripStatus::Pending) =>
            {
                DriverChange::Clear
            }
            _ => DriverChange::Keep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tripline_store::memory::MemoryStore;

    const ALL_STATUSES: [TripStatus; 6] = [
        TripStatus::NotConfirmed,
        TripStatus::Pending,
        TripStatus::Confirmed,
        TripStatus::Rejected,
        TripStatus::Booked,
        TripStatus::Cancelled,
    ];

    fn engine_with_store() -> (TransitionEngine, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let engine = TransitionEngine::new(store.clone(), store.clone());
        (engine, store)
    }

    async fn seed_trip(store: &MemoryStore, status: TripStatus) -> Trip {
        let mut trip = Trip::new("owner-1".to_string());
        trip.status = status;
        if matches!(
            status,
            TripStatus::Pending | TripStatus::Confirmed | TripStatus::Booked
        ) {
            trip.driver = Some("d@x.com".to_string());
        }
        store.insert_trip(&trip).await.unwrap();
        trip
    }

    #[tokio::test]
    async fn test_transition_closure() {
        // Every pair in the table succeeds; every pair outside it fails
        // with InvalidTransition.
        for from in ALL_STATUSES {
            for to in ALL_STATUSES {
                let (engine, store) = engine_with_store();
                let trip = seed_trip(&store, from).await;

                let result = engine.transition(trip.id, to).await;
                if from.can_transition_to(to) {
                    let updated = result.unwrap();
                    assert_eq!(updated.status, to, "{} -> {}", from, to);
                } else {
                    assert!(
                        matches!(result, Err(WorkflowError::InvalidTransition { .. })),
                        "{} -> {} should be rejected",
                        from,
                        to
                    );
                }
            }
        }
    }

    #[tokio::test]
    async fn test_cancelled_is_terminal() {
        let (engine, store) = engine_with_store();
        let trip = seed_trip(&store, TripStatus::Pending).await;

        engine.transition(trip.id, TripStatus::Cancelled).await.unwrap();
        for to in ALL_STATUSES {
            let result = engine.transition(trip.id, to).await;
            assert!(matches!(
                result,
                Err(WorkflowError::InvalidTransition { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_cancellation_clears_driver() {
        let (engine, store) = engine_with_store();
        let trip = seed_trip(&store, TripStatus::Pending).await;

        let updated = engine.transition(trip.id, TripStatus::Cancelled).await.unwrap();
        assert_eq!(updated.status, TripStatus::Cancelled);
        assert_eq!(updated.driver, None);
        assert!(updated.version > trip.version);
    }

    #[tokio::test]
    async fn test_booked_with_driver_payload_sets_driver() {
        let (engine, store) = engine_with_store();
        let trip = seed_trip(&store, TripStatus::NotConfirmed).await;

        let updated = engine
            .transition_with_driver(
                trip.id,
                TripStatus::Booked,
                DriverChange::Assign("d@x.com".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(updated.status, TripStatus::Booked);
        assert_eq!(updated.driver.as_deref(), Some("d@x.com"));
    }

    #[tokio::test]
    async fn test_missing_trip_is_not_found() {
        let (engine, _store) = engine_with_store();
        let result = engine.transition(Uuid::new_v4(), TripStatus::Pending).await;
        assert!(matches!(result, Err(WorkflowError::NotFound(_))));
    }
}
