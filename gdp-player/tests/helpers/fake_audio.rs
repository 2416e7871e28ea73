//! Audio backend that plays nothing
//!
//! Hands out a `PlaybackControl` per play request; tests finish or fail
//! playback by flipping the control themselves.

use gdp_player::audio::{AudioBackend, PlaybackControl};
use gdp_player::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
pub struct FakeBackend {
    failure: Option<String>,
    /// Blocks each play request this long, like a device that is slow to open
    startup_delay: Duration,
    started: AtomicUsize,
    plays: Mutex<Vec<(PathBuf, Arc<PlaybackControl>)>>,
    /// File contents seen at play time
    played_bytes: Mutex<Vec<Vec<u8>>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Backend whose every play request fails with `message`
    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            failure: Some(message.to_string()),
            ..Default::default()
        })
    }

    /// Backend that takes `delay` to open the output for each play request
    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            startup_delay: delay,
            ..Default::default()
        })
    }

    pub fn play_count(&self) -> usize {
        self.plays.lock().unwrap().len()
    }

    pub fn played_paths(&self) -> Vec<PathBuf> {
        self.plays
            .lock()
            .unwrap()
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }

    pub fn played_bytes(&self) -> Vec<Vec<u8>> {
        self.played_bytes.lock().unwrap().clone()
    }

    /// Wait until a play request has reached the backend
    pub async fn wait_for_start(&self) {
        let deadline = tokio::time::Instant::now() + super::WAIT_TIMEOUT;
        while self.started.load(Ordering::SeqCst) == 0 {
            assert!(
                tokio::time::Instant::now() < deadline,
                "backend was never asked to play"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Wait for the next play request and return its control
    pub async fn wait_for_play(&self) -> Arc<PlaybackControl> {
        let deadline = tokio::time::Instant::now() + super::WAIT_TIMEOUT;
        loop {
            if let Some((_, control)) = self.plays.lock().unwrap().last() {
                return Arc::clone(control);
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "backend was never asked to play"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl AudioBackend for FakeBackend {
    fn play(&self, path: &Path) -> Result<Arc<PlaybackControl>> {
        if let Some(message) = &self.failure {
            return Err(Error::AudioOutput(message.clone()));
        }

        let bytes = std::fs::read(path)?;
        self.played_bytes.lock().unwrap().push(bytes);

        self.started.fetch_add(1, Ordering::SeqCst);
        if !self.startup_delay.is_zero() {
            std::thread::sleep(self.startup_delay);
        }

        let control = Arc::new(PlaybackControl::new());
        control.set_sample_rate(44100);
        self.plays
            .lock()
            .unwrap()
            .push((path.to_path_buf(), Arc::clone(&control)));
        Ok(control)
    }
}
