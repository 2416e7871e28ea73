//! HTTP API handlers for gdp-player

pub mod handlers;
pub mod health;
pub mod sse;
pub mod ui;

pub use handlers::{get_build_info, get_status, list_audio_devices, play, quit, toggle_pause};
pub use health::health_routes;
pub use sse::event_stream;
pub use ui::{serve_app_js, serve_index, serve_player_css};
