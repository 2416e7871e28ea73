//! Server-Sent Events (SSE) utilities
//!
//! Turns the [`EventBus`] into an axum SSE response. Streams end when the
//! shutdown token is cancelled.

use crate::events::EventBus;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Create an SSE stream forwarding every bus event
///
/// The first event is `ConnectionStatus: connected` so the page can show its
/// connection indicator before anything else happens. The stream ends when
/// `shutdown` is cancelled.
pub fn event_stream(
    bus: &EventBus,
    shutdown: CancellationToken,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = bus.subscribe();
    info!("New SSE client connected ({} subscribers)", bus.subscriber_count());

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            let received = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!("SSE: server shutting down, ending stream");
                    break;
                }
                received = rx.recv() => received,
            };

            match received {
                Ok(event) => {
                    let event_type = event.event_type();
                    match serde_json::to_string(&event) {
                        Ok(json) => {
                            debug!("SSE: Broadcasting event: {}", event_type);
                            yield Ok(Event::default().event(event_type).data(json));
                        }
                        Err(e) => {
                            warn!("SSE: Failed to serialize event {}: {}", event_type, e);
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("SSE: client lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => {
                    debug!("SSE: event bus closed, ending stream");
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
