//! Audio playback
//!
//! Uses symphonia for decoding, rubato for sample-rate conversion and cpal
//! for output. Decoded stereo samples travel to the device callback through
//! a lock-free ring buffer.
//!
//! The session never touches cpal directly: it asks an [`AudioBackend`] to
//! play a file and then steers playback through the returned
//! [`PlaybackControl`].

pub mod decoder;
pub mod output;
pub mod resampler;

pub use decoder::StreamingDecoder;
pub use output::{AudioOutput, CpalBackend};
pub use resampler::StreamResampler;

use crate::error::Result;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Something that can play an audio file
pub trait AudioBackend: Send + Sync {
    /// Start playing `path`
    ///
    /// Returns once playback has started; a file that cannot be opened or a
    /// missing output device is reported here rather than asynchronously.
    fn play(&self, path: &Path) -> Result<Arc<PlaybackControl>>;
}

/// Shared state between a playback session and the audio thread
#[derive(Debug, Default)]
pub struct PlaybackControl {
    paused: AtomicBool,
    stopped: AtomicBool,
    decode_done: AtomicBool,
    finished: AtomicBool,
    frames_played: AtomicU64,
    sample_rate: AtomicU32,
    failure: Mutex<Option<String>>,
}

impl PlaybackControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Ask the audio thread to stop and release the device
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn mark_decode_done(&self) {
        self.decode_done.store(true, Ordering::SeqCst);
    }

    pub fn is_decode_done(&self) -> bool {
        self.decode_done.load(Ordering::SeqCst)
    }

    /// Set by the audio thread when it has released the device
    pub fn mark_finished(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Record a playback failure; the first one wins
    pub fn fail(&self, message: impl Into<String>) {
        let mut slot = self.failure.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_none() {
            *slot = Some(message.into());
        }
    }

    pub fn failure(&self) -> Option<String> {
        self.failure
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_sample_rate(&self, rate: u32) {
        self.sample_rate.store(rate, Ordering::SeqCst);
    }

    pub fn add_frames(&self, frames: u64) {
        self.frames_played.fetch_add(frames, Ordering::Relaxed);
    }

    /// Elapsed playback time (pauses excluded)
    pub fn position(&self) -> Duration {
        let rate = self.sample_rate.load(Ordering::SeqCst);
        if rate == 0 {
            return Duration::ZERO;
        }
        let frames = self.frames_played.load(Ordering::Relaxed);
        Duration::from_secs_f64(frames as f64 / rate as f64)
    }
}

/// Duplicate or drop channels so every frame is (left, right)
pub fn to_stereo(samples: &[f32], channels: usize) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.iter().flat_map(|&s| [s, s]).collect(),
        2 => samples.to_vec(),
        n => samples
            .chunks_exact(n)
            .flat_map(|frame| [frame[0], frame[1]])
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pause_resume_stop() {
        let control = PlaybackControl::new();
        assert!(!control.is_paused());

        control.pause();
        assert!(control.is_paused());
        control.resume();
        assert!(!control.is_paused());

        control.stop();
        assert!(control.is_stopped());
        assert!(!control.is_finished());
        control.mark_finished();
        assert!(control.is_finished());
    }

    #[test]
    fn test_first_failure_is_kept() {
        let control = PlaybackControl::new();
        assert!(control.failure().is_none());
        control.fail("device unplugged");
        control.fail("second problem");
        assert_eq!(control.failure().as_deref(), Some("device unplugged"));
    }

    #[test]
    fn test_position_from_frames() {
        let control = PlaybackControl::new();
        assert_eq!(control.position(), Duration::ZERO);

        control.set_sample_rate(44100);
        control.add_frames(44100);
        control.add_frames(22050);
        assert_eq!(control.position(), Duration::from_millis(1500));
    }

    #[test]
    fn test_to_stereo() {
        assert_eq!(to_stereo(&[0.1, 0.2], 1), vec![0.1, 0.1, 0.2, 0.2]);
        assert_eq!(to_stereo(&[0.1, 0.2], 2), vec![0.1, 0.2]);
        assert_eq!(
            to_stereo(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6], 3),
            vec![0.1, 0.2, 0.4, 0.5]
        );
    }
}
