//! Song player: drives one playback session at a time
//!
//! A play request claims the player and spawns a session task that searches
//! the archive, walks random shows until one has a matching audio file,
//! downloads it and plays it to the end. All state lives behind one
//! `RwLock`; every change is published on the [`EventBus`].

use super::RecentSongs;
use crate::archive::{
    choose_audio_file, local_file_name, not_played_message, song_info, take_random_show,
    ArchiveClient, AudioFileEntry, ShowMetadata,
};
use crate::audio::{AudioBackend, PlaybackControl};
use crate::error::{Error, Result};
use gdp_common::config::PlaybackSettings;
use gdp_common::events::{EventBus, PlaybackState, PlayerEvent, SongInfo};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Status line shown before the first request
pub const READY_STATUS: &str = "Ready";

/// Point-in-time view of the player, as served by `GET /status`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSnapshot {
    pub state: PlaybackState,
    pub status: String,
    pub now_playing: Option<SongInfo>,
    pub recent_songs: Vec<String>,
    pub pause_label: String,
    pub current_file: Option<PathBuf>,
    /// Seconds of audio played in the current session
    pub position_secs: f64,
}

struct SessionInner {
    state: PlaybackState,
    status: String,
    now_playing: Option<SongInfo>,
    recent: RecentSongs,
    current_file: Option<PathBuf>,
    control: Option<Arc<PlaybackControl>>,
    cancel: Option<CancellationToken>,
}

/// Cheap to clone; clones share the same session
#[derive(Clone)]
pub struct SongPlayer {
    inner: Arc<RwLock<SessionInner>>,
    archive: ArchiveClient,
    backend: Arc<dyn AudioBackend>,
    events: EventBus,
    download_dir: PathBuf,
    settings: PlaybackSettings,
}

impl SongPlayer {
    pub fn new(
        archive: ArchiveClient,
        backend: Arc<dyn AudioBackend>,
        events: EventBus,
        download_dir: PathBuf,
        settings: PlaybackSettings,
    ) -> Self {
        let inner = SessionInner {
            state: PlaybackState::Idle,
            status: READY_STATUS.to_string(),
            now_playing: None,
            recent: RecentSongs::new(settings.recent_songs_limit),
            current_file: None,
            control: None,
            cancel: None,
        };

        Self {
            inner: Arc::new(RwLock::new(inner)),
            archive,
            backend,
            events,
            download_dir,
            settings,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Start a session for `song`
    ///
    /// Returns as soon as the session task is spawned. Fails with
    /// `InvalidInput` for a blank title and `InvalidState` while another
    /// session holds the player.
    pub async fn play(&self, song: &str) -> Result<()> {
        let song = song.trim().to_string();
        if song.is_empty() {
            return Err(Error::InvalidInput("Song title must not be empty".to_string()));
        }

        let cancel = CancellationToken::new();
        let status = format!("Fetching show data for '{}'...", song);

        let (old_state, recent) = {
            let mut inner = self.inner.write().await;
            if inner.state.is_active() {
                return Err(Error::InvalidState(format!(
                    "Player is busy ({})",
                    inner.state
                )));
            }

            let recent = inner.recent.record(&song).then(|| inner.recent.to_vec());
            let old_state = std::mem::replace(&mut inner.state, PlaybackState::Searching);
            inner.status = status.clone();
            inner.cancel = Some(cancel.clone());
            (old_state, recent)
        };

        info!(song = %song, "Play requested");

        if let Some(songs) = recent {
            self.events.emit_lossy(PlayerEvent::recent_songs(songs));
        }
        self.events
            .emit_lossy(PlayerEvent::state_changed(old_state, PlaybackState::Searching));
        self.events.emit_lossy(PlayerEvent::status(status));

        let span = info_span!("session", id = %Uuid::new_v4(), song = %song);
        let player = self.clone();
        tokio::spawn(
            async move {
                player.run_session(song, cancel).await;
            }
            .instrument(span),
        );

        Ok(())
    }

    /// Pause or resume the current track
    ///
    /// Only acts while Playing or Paused; otherwise returns the current state
    /// unchanged.
    pub async fn toggle_pause(&self) -> PlaybackState {
        let (old_state, new_state) = {
            let mut inner = self.inner.write().await;
            let old_state = inner.state;
            let new_state = match (old_state, inner.control.as_ref()) {
                (PlaybackState::Playing, Some(control)) => {
                    control.pause();
                    PlaybackState::Paused
                }
                (PlaybackState::Paused, Some(control)) => {
                    control.resume();
                    PlaybackState::Playing
                }
                _ => return old_state,
            };
            inner.state = new_state;
            (old_state, new_state)
        };

        match new_state {
            PlaybackState::Paused => info!("Playback paused"),
            _ => info!("Playback resumed"),
        }
        self.events
            .emit_lossy(PlayerEvent::state_changed(old_state, new_state));
        new_state
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.read().await;
        SessionSnapshot {
            state: inner.state,
            status: inner.status.clone(),
            now_playing: inner.now_playing.clone(),
            recent_songs: inner.recent.to_vec(),
            pause_label: inner.state.pause_label().to_string(),
            current_file: inner.current_file.clone(),
            position_secs: inner
                .control
                .as_ref()
                .map(|c| c.position().as_secs_f64())
                .unwrap_or(0.0),
        }
    }

    pub async fn state(&self) -> PlaybackState {
        self.inner.read().await.state
    }

    /// Cancel any session, stop playback and remove the downloaded file
    pub async fn shutdown(&self) {
        let cancel = self.inner.write().await.cancel.take();
        if let Some(cancel) = cancel {
            info!("Cancelling active session");
            cancel.cancel();
        }
        self.end_session().await;
    }

    async fn run_session(self, song: String, cancel: CancellationToken) {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(song = %song, "Session cancelled");
                return;
            }
            outcome = self.search_and_play(&song, &cancel) => outcome,
        };

        if let Err(e) = outcome {
            error!(song = %song, "Session failed: {}", e);
            self.set_status(format!("Error: {}", e)).await;
        }
        self.end_session().await;
    }

    async fn search_and_play(&self, song: &str, cancel: &CancellationToken) -> Result<()> {
        let mut shows = self.archive.search_shows(song).await?;
        self.set_status(format!(
            "Found {} shows containing the song '{}'",
            shows.len(),
            song
        ))
        .await;

        let mut rng = StdRng::from_entropy();
        while let Some(show) = take_random_show(&mut shows, &mut rng) {
            let metadata = match self.archive.fetch_show_metadata(&show).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(show = %show, "Skipping show, metadata unavailable: {}", e);
                    continue;
                }
            };

            match choose_audio_file(&metadata, song, self.archive.audio_format(), &mut rng) {
                Some(entry) => return self.play_entry(&show, &metadata, &entry, cancel).await,
                None => {
                    self.set_status(not_played_message(song, &metadata)).await;
                }
            }
        }

        self.set_status(format!("No audio files found for the song '{}'", song))
            .await;
        Ok(())
    }

    async fn play_entry(
        &self,
        show: &str,
        metadata: &ShowMetadata,
        entry: &AudioFileEntry,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let info = song_info(metadata, entry);
        let path = self.download_dir.join(local_file_name(&entry.name));
        info!(show = %show, file = %entry.name, "Selected audio file");

        {
            let mut inner = self.inner.write().await;
            inner.now_playing = Some(info.clone());
            inner.current_file = Some(path.clone());
        }
        self.events.emit_lossy(PlayerEvent::now_playing(info));
        self.set_state(PlaybackState::Downloading).await;
        self.set_status(format!("Downloading audio file: {}", path.display()))
            .await;

        let path = self
            .archive
            .download_file(show, entry, &self.download_dir)
            .await?;

        self.set_status(format!("Playing audio file: {}", path.display()))
            .await;

        // This future is dropped if the session is cancelled while the device
        // opens, so the watcher is set up on the blocking side.
        let backend = Arc::clone(&self.backend);
        let play_path = path.clone();
        let session = cancel.clone();
        let runtime = tokio::runtime::Handle::current();
        let control = tokio::task::spawn_blocking(move || {
            let control = backend.play(&play_path)?;
            let watched = Arc::clone(&control);
            runtime.spawn(async move {
                session.cancelled().await;
                watched.stop();
            });
            Ok::<_, Error>(control)
        })
        .await
        .map_err(|e| Error::AudioOutput(format!("Playback task failed: {}", e)))??;

        {
            let mut inner = self.inner.write().await;
            inner.control = Some(Arc::clone(&control));
        }
        self.set_state(PlaybackState::Playing).await;

        // Paused playback keeps polling; the session only ends when the
        // audio thread reports it is done.
        let mut ticker = tokio::time::interval(self.settings.poll_interval());
        while !control.is_finished() {
            ticker.tick().await;
        }

        if let Some(failure) = control.failure() {
            return Err(Error::AudioOutput(failure));
        }

        info!(path = %path.display(), "Playback finished");
        self.set_status(format!("Finished playing audio file: {}", path.display()))
            .await;
        tokio::time::sleep(self.settings.cleanup_delay()).await;
        Ok(())
    }

    /// Release playback, delete the file and return to Idle
    async fn end_session(&self) {
        let (cancel, control, file, old_state) = {
            let mut inner = self.inner.write().await;
            (
                inner.cancel.take(),
                inner.control.take(),
                inner.current_file.take(),
                std::mem::replace(&mut inner.state, PlaybackState::Idle),
            )
        };

        if let Some(cancel) = cancel {
            cancel.cancel();
        }
        if let Some(control) = control {
            control.stop();
        }
        if let Some(path) = file {
            delete_audio_file(&path).await;
        }
        if old_state != PlaybackState::Idle {
            self.events
                .emit_lossy(PlayerEvent::state_changed(old_state, PlaybackState::Idle));
        }
    }

    async fn set_status(&self, status: String) {
        info!("{}", status);
        self.inner.write().await.status = status.clone();
        self.events.emit_lossy(PlayerEvent::status(status));
    }

    async fn set_state(&self, new_state: PlaybackState) {
        let old_state = std::mem::replace(&mut self.inner.write().await.state, new_state);
        if old_state != new_state {
            debug!("Playback state: {} -> {}", old_state, new_state);
            self.events
                .emit_lossy(PlayerEvent::state_changed(old_state, new_state));
        }
    }
}

/// Remove a downloaded audio file, logging instead of failing
pub async fn delete_audio_file(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => info!("Deleted audio file: {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Audio file already gone: {}", path.display())
        }
        Err(e) => warn!("Error deleting audio file {}: {}", path.display(), e),
    }
}
