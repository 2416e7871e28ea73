//! gdp-player - Grateful Dead song player
//!
//! Serves the player UI on the loopback interface and plays random live
//! recordings from archive.org.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use gdp_common::config::{PlayerConfig, TomlConfig};
use gdp_common::events::EventBus;
use gdp_player::archive::ArchiveClient;
use gdp_player::audio::{AudioOutput, CpalBackend};
use gdp_player::cli::Args;
use gdp_player::{build_router, AppState, SongPlayer};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // The file's log level has to be known before the subscriber exists;
    // the real load below reports any problem with the file.
    let config_path = args.config_path();
    let file_level = config_path
        .as_deref()
        .and_then(|path| TomlConfig::load(path).ok())
        .map(|config| config.logging.level);
    let level = args
        .log_level
        .clone()
        .or(file_level)
        .unwrap_or_else(|| "info".to_string());

    init_tracing(&level);

    info!(
        "Starting gdp-player v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    if args.list_devices {
        let devices = AudioOutput::list_devices().context("Failed to list audio devices")?;
        for device in devices {
            println!("{}", device);
        }
        return Ok(());
    }

    let toml_config = TomlConfig::load_or_default(config_path.as_deref());
    let config = PlayerConfig::resolve(toml_config, args.overrides());
    config.validate().context("Invalid configuration")?;

    info!("Archive: {}", config.archive.base_url);
    info!("Download directory: {}", config.download_dir.display());
    if let Some(device) = &config.playback.audio_device {
        info!("Audio device: {}", device);
    }

    tokio::fs::create_dir_all(&config.download_dir)
        .await
        .with_context(|| {
            format!(
                "Failed to create download directory {}",
                config.download_dir.display()
            )
        })?;

    let archive =
        ArchiveClient::new(config.archive.clone()).context("Failed to create archive client")?;
    let backend = Arc::new(CpalBackend::new(config.playback.audio_device.clone()));
    let event_bus = EventBus::new(100);

    let player = SongPlayer::new(
        archive,
        backend,
        event_bus,
        config.download_dir.clone(),
        config.playback.clone(),
    );

    let shutdown = CancellationToken::new();
    let app = build_router(AppState::new(player.clone(), shutdown.clone()));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("gdp-player listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("Server error")?;

    player.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins; otherwise `level` applies to the player's own crates
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "gdp_player={level},gdp_common={level},tower_http={level}"
        ))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Resolves on Ctrl+C, SIGTERM or `POST /quit`
///
/// Cancels `quit` on the way out so open event streams close and the
/// server can finish.
async fn shutdown_signal(quit: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
        _ = quit.cancelled() => {
            info!("Quit requested from UI, shutting down");
        },
    }

    quit.cancel();
}
