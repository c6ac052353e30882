use tokio::sync::broadcast;
use tripline_shared::models::events::TripChangedEvent;

/// Change-notification feed for trip updates. One broadcast channel for the
/// whole store keeps per-trip delivery order; subscribers filter by trip id.
/// At-least-once: a lagged receiver drops to the newest events.
#[derive(Clone)]
pub struct TripFeed {
    tx: broadcast::Sender<TripChangedEvent>,
}

impl TripFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: TripChangedEvent) {
        tracing::debug!(trip_id = %event.trip_id, status = %event.status, "Publishing trip change");
        // No receivers is fine; the state change is the durable outcome.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TripChangedEvent> {
        self.tx.subscribe()
    }
}

impl Default for TripFeed {
    fn default() -> Self {
        Self::new(100)
    }
}
