//! Event types and EventBus for the GDP player
//!
//! Every observable change of the player (status line, playback state, now
//! playing info, recent songs) is published as a [`PlayerEvent`]. The UI
//! receives them over SSE.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Lifecycle state of the player
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub enum PlaybackState {
    /// No session running
    #[default]
    Idle,
    /// Querying the archive for shows and audio files
    Searching,
    /// Fetching the chosen audio file
    Downloading,
    /// Audio is playing
    Playing,
    /// Audio is paused mid-session
    Paused,
}

impl PlaybackState {
    /// True while a playback session holds the player
    pub fn is_active(self) -> bool {
        !matches!(self, PlaybackState::Idle)
    }

    /// Label of the pause/resume button for this state
    pub fn pause_label(self) -> &'static str {
        match self {
            PlaybackState::Paused => "Resume",
            _ => "Pause",
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "Idle"),
            PlaybackState::Searching => write!(f, "Searching"),
            PlaybackState::Downloading => write!(f, "Downloading"),
            PlaybackState::Playing => write!(f, "Playing"),
            PlaybackState::Paused => write!(f, "Paused"),
        }
    }
}

/// Display information for the track being played
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SongInfo {
    /// Audio file name within the show
    pub title: String,
    /// Show creator
    pub artist: String,
    /// Show title
    pub album: String,
}

/// Player event types
///
/// Serialized with a `type` tag for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Status line text changed
    StatusChanged {
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// Playback state changed (e.g. Playing ↔ Paused)
    PlaybackStateChanged {
        old_state: PlaybackState,
        new_state: PlaybackState,
        timestamp: DateTime<Utc>,
    },

    /// A track was chosen and is about to be downloaded and played
    NowPlaying {
        song: SongInfo,
        timestamp: DateTime<Utc>,
    },

    /// Recently requested songs list changed
    RecentSongsChanged {
        songs: Vec<String>,
        timestamp: DateTime<Utc>,
    },
}

impl PlayerEvent {
    pub fn status(message: impl Into<String>) -> Self {
        PlayerEvent::StatusChanged {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn state_changed(old_state: PlaybackState, new_state: PlaybackState) -> Self {
        PlayerEvent::PlaybackStateChanged {
            old_state,
            new_state,
            timestamp: Utc::now(),
        }
    }

    pub fn now_playing(song: SongInfo) -> Self {
        PlayerEvent::NowPlaying {
            song,
            timestamp: Utc::now(),
        }
    }

    pub fn recent_songs(songs: Vec<String>) -> Self {
        PlayerEvent::RecentSongsChanged {
            songs,
            timestamp: Utc::now(),
        }
    }

    /// SSE event name
    pub fn event_type(&self) -> &'static str {
        match self {
            PlayerEvent::StatusChanged { .. } => "StatusChanged",
            PlayerEvent::PlaybackStateChanged { .. } => "PlaybackStateChanged",
            PlayerEvent::NowPlaying { .. } => "NowPlaying",
            PlayerEvent::RecentSongsChanged { .. } => "RecentSongsChanged",
        }
    }
}

/// Central event distribution bus
///
/// Wraps `tokio::sync::broadcast`: publishing never blocks, slow subscribers
/// see a `Lagged` error instead of stalling the player.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)`, or `Err` when nobody is listening.
    pub fn emit(
        &self,
        event: PlayerEvent,
    ) -> Result<usize, broadcast::error::SendError<PlayerEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
