//! Test helper utilities
//!
//! Shared by the gdp-player integration tests. Each test binary uses a
//! different subset, hence the dead_code allowance.

#![allow(dead_code)]

pub mod fake_audio;
pub mod mock_archive;

pub use fake_audio::FakeBackend;
pub use mock_archive::{show_metadata, MockArchive, MockArchiveServer};

use gdp_common::config::{ArchiveSettings, PlaybackSettings};
use gdp_common::events::{EventBus, PlaybackState, PlayerEvent};
use gdp_player::archive::ArchiveClient;
use gdp_player::SongPlayer;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// How long any wait in the tests may take before failing
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn archive_client(base_url: &str) -> ArchiveClient {
    ArchiveClient::new(ArchiveSettings {
        base_url: base_url.to_string(),
        request_timeout_secs: 5,
        ..Default::default()
    })
    .expect("archive client")
}

/// Player wired to a mock archive and a fake backend, with fast timings
pub fn test_player(base_url: &str, backend: Arc<FakeBackend>, download_dir: &Path) -> SongPlayer {
    SongPlayer::new(
        archive_client(base_url),
        backend,
        EventBus::new(256),
        download_dir.to_path_buf(),
        PlaybackSettings {
            poll_interval_ms: 10,
            cleanup_delay_ms: 10,
            ..Default::default()
        },
    )
}

/// Poll until the player reaches `state`
pub async fn wait_for_state(player: &SongPlayer, state: PlaybackState) {
    let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
    loop {
        let current = player.state().await;
        if current == state {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {:?}, player is {:?}",
            state,
            current
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Status messages received so far, in order
pub fn drain_statuses(rx: &mut broadcast::Receiver<PlayerEvent>) -> Vec<String> {
    let mut statuses = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let PlayerEvent::StatusChanged { message, .. } = event {
            statuses.push(message);
        }
    }
    statuses
}
