use uuid::Uuid;

/// Emitted by the trip store on every persisted status/driver change.
/// Consumers subscribe per-trip; delivery is at-least-once with per-trip
/// ordering preserved by the single broadcast channel.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct TripChangedEvent {
    pub trip_id: Uuid,
    pub status: String,
    pub driver: Option<String>,
    pub version: i64,
    pub occurred_at: i64,
}
