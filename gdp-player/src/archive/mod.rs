//! archive.org integration
//!
//! - `client`: HTTP client for the search, metadata and download endpoints
//! - `models`: JSON response types
//! - `selection`: rules for picking a show and an audio file

pub mod client;
pub mod models;
pub mod selection;

pub use client::{local_file_name, ArchiveClient};
pub use models::{AudioFileEntry, SearchResponse, ShowDetails, ShowMetadata};
pub use selection::{
    choose_audio_file, matching_audio_files, not_played_message, song_info, take_random_show,
};

use thiserror::Error;

/// Archive client errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Archive API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Download I/O error: {0}")]
    Io(#[from] std::io::Error),
}
