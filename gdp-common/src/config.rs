//! Configuration loading and resolution
//!
//! Settings come from three places, highest priority first:
//! 1. Command-line arguments / environment variables (merged by clap)
//! 2. TOML config file
//! 3. Compiled defaults
//!
//! A missing or unreadable TOML file is never fatal: a warning is logged and
//! the compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

/// Default HTTP port for the player UI
pub const DEFAULT_PORT: u16 = 5780;

/// Default archive base URL
pub const DEFAULT_ARCHIVE_URL: &str = "https://archive.org";

/// Settings file contents
///
/// Every field is optional in the file; absent keys take the compiled default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Interface the UI server binds to
    pub host: String,

    /// UI server port
    pub port: u16,

    /// Where downloaded audio files are written (OS temp dir when unset)
    pub download_dir: Option<PathBuf>,

    /// Archive API settings
    pub archive: ArchiveSettings,

    /// Playback session settings
    pub playback: PlaybackSettings,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            download_dir: None,
            archive: ArchiveSettings::default(),
            playback: PlaybackSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Archive API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveSettings {
    /// Base URL of the archive (search, metadata and download endpoints hang off it)
    pub base_url: String,

    /// Words prepended to every search query
    pub search_prefix: String,

    /// Maximum number of shows requested from the search endpoint
    pub search_rows: u32,

    /// File format tag an audio file entry must carry to be playable
    pub audio_format: String,

    /// Per-request timeout
    pub request_timeout_secs: u64,
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ARCHIVE_URL.to_string(),
            search_prefix: "grateful dead".to_string(),
            search_rows: 500,
            audio_format: "VBR MP3".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ArchiveSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Playback session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Number of recently requested songs remembered for the song picker
    pub recent_songs_limit: usize,

    /// How often a running session checks whether playback has finished
    pub poll_interval_ms: u64,

    /// Delay between playback completion and deleting the downloaded file
    pub cleanup_delay_ms: u64,

    /// Output device name (system default when unset)
    pub audio_device: Option<String>,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            recent_songs_limit: 5,
            poll_interval_ms: 100,
            cleanup_delay_ms: 1000,
            audio_device: None,
        }
    }
}

impl PlaybackSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn cleanup_delay(&self) -> Duration {
        Duration::from_millis(self.cleanup_delay_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Read and parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Load the config file, falling back to defaults
    ///
    /// `path` of `None` means the platform default location.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => {
                    warn!("Could not determine config directory, using built-in defaults");
                    return Self::default();
                }
            },
        };

        if !path.exists() {
            warn!(
                "Config file {} not found, using built-in defaults",
                path.display()
            );
            return Self::default();
        }

        match Self::load(&path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                error!("{} - using built-in defaults", e);
                Self::default()
            }
        }
    }
}

/// Platform config file location: `<config_dir>/gdp/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("gdp").join("config.toml"))
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub download_dir: Option<PathBuf>,
    pub archive_url: Option<String>,
    pub audio_device: Option<String>,
    pub log_level: Option<String>,
}

/// Fully resolved player configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    pub host: String,
    pub port: u16,
    pub download_dir: PathBuf,
    pub archive: ArchiveSettings,
    pub playback: PlaybackSettings,
    pub log_level: String,
}

impl PlayerConfig {
    /// Merge overrides onto the file config
    pub fn resolve(toml: TomlConfig, overrides: ConfigOverrides) -> Self {
        let mut archive = toml.archive;
        if let Some(url) = overrides.archive_url {
            archive.base_url = url;
        }

        let mut playback = toml.playback;
        if overrides.audio_device.is_some() {
            playback.audio_device = overrides.audio_device;
        }

        let download_dir = overrides
            .download_dir
            .or(toml.download_dir)
            .unwrap_or_else(std::env::temp_dir);

        Self {
            host: overrides.host.unwrap_or(toml.host),
            port: overrides.port.unwrap_or(toml.port),
            download_dir,
            archive,
            playback,
            log_level: overrides.log_level.unwrap_or(toml.logging.level),
        }
    }

    /// Reject settings the player cannot run with
    pub fn validate(&self) -> Result<()> {
        let base = self.archive.base_url.as_str();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(Error::Config(format!(
                "archive.base_url must be an http(s) URL, got '{}'",
                base
            )));
        }
        if self.archive.search_rows == 0 {
            return Err(Error::Config("archive.search_rows must be at least 1".to_string()));
        }
        if self.archive.audio_format.trim().is_empty() {
            return Err(Error::Config("archive.audio_format must not be empty".to_string()));
        }
        if self.playback.recent_songs_limit == 0 {
            return Err(Error::Config(
                "playback.recent_songs_limit must be at least 1".to_string(),
            ));
        }
        if self.playback.poll_interval_ms == 0 {
            return Err(Error::Config(
                "playback.poll_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// `host:port` string for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self::resolve(TomlConfig::default(), ConfigOverrides::default())
    }
}
