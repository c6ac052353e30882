use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Extension,
};
use futures_util::{Stream, StreamExt};
use std::convert::Infallible;
use uuid::Uuid;

use tripline_core::error::WorkflowError;
use tripline_core::identity::Identity;

use crate::error::AppError;
use crate::state::AppState;

/// GET /v1/trips/:id/stream
/// Per-trip change feed over SSE. Consumers stay in sync without polling;
/// events for other trips are filtered out client-side of the broadcast.
pub async fn stream_trip(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(trip_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let trip = state
        .trips
        .get_trip(trip_id)
        .await
        .map_err(WorkflowError::from)?
        .ok_or_else(|| WorkflowError::NotFound(format!("Trip {}", trip_id)))?;
    if trip.owner_id != identity.id {
        return Err(AppError(WorkflowError::Forbidden(
            "Only the trip owner can subscribe to this trip".to_string(),
        )));
    }

    let rx = state.feed.subscribe();
    let stream = tokio_stream::wrappers::BroadcastStream::new(rx).filter_map(move |result| {
        async move {
            match result {
                Ok(event) if event.trip_id == trip_id => Some(Ok::<_, Infallible>(
                    Event::default()
                        .event("trip_changed")
                        .data(serde_json::to_string(&event).unwrap_or_default()),
                )),
                // Other trips and lagged-receiver gaps are skipped.
                _ => None,
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
