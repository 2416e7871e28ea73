//! Playback sessions
//!
//! A session runs from a play request until the track finishes, fails or
//! the player shuts down. Pausing keeps the session alive.

pub mod player;
pub mod recent;

pub use player::{delete_audio_file, SessionSnapshot, SongPlayer};
pub use recent::RecentSongs;
