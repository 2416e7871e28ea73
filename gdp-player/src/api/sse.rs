//! Server-Sent Events endpoint

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

/// GET /events
///
/// Streams `StatusChanged`, `PlaybackStateChanged`, `NowPlaying` and
/// `RecentSongsChanged` events to the page until the server shuts down.
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    gdp_common::sse::event_stream(&state.event_bus, state.shutdown.clone())
}
