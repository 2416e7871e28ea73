//! Command-line arguments

use clap::Parser;
use gdp_common::config::{default_config_path, ConfigOverrides};
use std::path::PathBuf;

/// Command-line arguments for gdp-player
///
/// Every option can also come from its environment variable; both take
/// priority over the TOML config file.
#[derive(Parser, Debug, Clone)]
#[command(name = "gdp-player")]
#[command(about = "Play a random live Grateful Dead recording of a song")]
#[command(version)]
pub struct Args {
    /// TOML config file (defaults to <config dir>/gdp/config.toml)
    #[arg(short, long, env = "GDP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Interface for the UI server
    #[arg(long, env = "GDP_HOST")]
    pub host: Option<String>,

    /// Port for the UI server
    #[arg(short, long, env = "GDP_PORT")]
    pub port: Option<u16>,

    /// Directory for downloaded audio files
    #[arg(short, long, env = "GDP_DOWNLOAD_DIR")]
    pub download_dir: Option<PathBuf>,

    /// archive.org base URL
    #[arg(long, env = "GDP_ARCHIVE_URL")]
    pub archive_url: Option<String>,

    /// Audio output device name
    #[arg(long, env = "GDP_AUDIO_DEVICE")]
    pub audio_device: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "GDP_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Print audio output devices and exit
    #[arg(long)]
    pub list_devices: bool,
}

impl Args {
    /// Config file to load, if a location is known
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(default_config_path)
    }

    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            download_dir: self.download_dir.clone(),
            archive_url: self.archive_url.clone(),
            audio_device: self.audio_device.clone(),
            log_level: self.log_level.clone(),
        }
    }
}
