//! gdp-player library - Grateful Dead song player
//!
//! Searches archive.org for shows containing a song, plays a random matching
//! recording and serves a small web UI on the loopback interface.

use axum::Router;
use gdp_common::events::EventBus;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod archive;
pub mod audio;
pub mod cli;
pub mod error;
pub mod session;

pub use error::{ApiError, Error, Result};
pub use session::SongPlayer;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub player: SongPlayer,
    pub event_bus: EventBus,
    /// Server start, for `/health` uptime
    pub startup_time: Instant,
    /// Cancelled by `POST /quit` to stop the server
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(player: SongPlayer, shutdown: CancellationToken) -> Self {
        Self {
            event_bus: player.events().clone(),
            player,
            startup_time: Instant::now(),
            shutdown,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        // UI
        .route("/", get(api::serve_index))
        .route("/static/app.js", get(api::serve_app_js))
        .route("/static/player.css", get(api::serve_player_css))
        // Player control
        .route("/status", get(api::get_status))
        .route("/play", post(api::play))
        .route("/pause", post(api::toggle_pause))
        .route("/quit", post(api::quit))
        .route("/audio/devices", get(api::list_audio_devices))
        // Live updates
        .route("/events", get(api::event_stream))
        .route("/build_info", get(api::get_build_info))
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
