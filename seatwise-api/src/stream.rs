use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures_util::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/v1/flights/{flight_number}/availability", get(availability_stream))
}

/// Live seat counts for one flight, one `seats_booked` event per committed leg.
async fn availability_stream(
    Path(flight_number): Path<String>,
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let flight_number = flight_number.clone();
        async move {
            match result {
                Ok(event) if event.flight_number == flight_number => Event::default()
                    .event("seats_booked")
                    .json_data(&event)
                    .ok()
                    .map(Ok),
                // Lagged receivers skip what they missed
                _ => None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
