//! HTTP request handlers
//!
//! Thin wrappers over [`SongPlayer`](crate::SongPlayer); errors are turned
//! into JSON responses by [`ApiError`].

use crate::audio::AudioOutput;
use crate::error::{ApiError, ApiResult};
use crate::session::SessionSnapshot;
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use gdp_common::events::PlaybackState;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    pub song: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlayResponse {
    pub status: String,
    pub song: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PauseResponse {
    pub state: PlaybackState,
    pub pause_label: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeviceListResponse {
    pub devices: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BuildInfo {
    pub version: String,
    pub git_hash: String,
    pub build_timestamp: String,
    pub build_profile: String,
}

/// GET /status
pub async fn get_status(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.player.snapshot().await)
}

/// POST /play
///
/// Starts a session in the background and answers 202 straight away.
pub async fn play(
    State(state): State<AppState>,
    Json(request): Json<PlayRequest>,
) -> ApiResult<(StatusCode, Json<PlayResponse>)> {
    state.player.play(&request.song).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(PlayResponse {
            status: "accepted".to_string(),
            song: request.song.trim().to_string(),
        }),
    ))
}

/// POST /pause
pub async fn toggle_pause(State(state): State<AppState>) -> Json<PauseResponse> {
    let new_state = state.player.toggle_pause().await;
    Json(PauseResponse {
        state: new_state,
        pause_label: new_state.pause_label().to_string(),
    })
}

/// POST /quit
///
/// Stops playback, deletes the downloaded file and shuts the server down.
pub async fn quit(State(state): State<AppState>) -> Json<StatusResponse> {
    info!("Quit requested");
    state.player.shutdown().await;
    state.shutdown.cancel();
    Json(StatusResponse {
        status: "shutting down".to_string(),
    })
}

/// GET /audio/devices
pub async fn list_audio_devices() -> ApiResult<Json<DeviceListResponse>> {
    let devices = tokio::task::spawn_blocking(AudioOutput::list_devices)
        .await
        .map_err(|e| ApiError::Internal(format!("Device enumeration task failed: {}", e)))?
        .map_err(|e| {
            error!("Failed to list audio devices: {}", e);
            ApiError::from(e)
        })?;

    info!("Found {} audio devices", devices.len());
    Ok(Json(DeviceListResponse { devices }))
}

/// GET /build_info
pub async fn get_build_info() -> Json<BuildInfo> {
    Json(BuildInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: env!("GIT_HASH").to_string(),
        build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        build_profile: env!("BUILD_PROFILE").to_string(),
    })
}
