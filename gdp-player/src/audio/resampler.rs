//! Streaming sample-rate conversion using rubato
//!
//! Decoded packets arrive in arbitrary sizes while rubato's fixed-input
//! resampler wants whole chunks, so input is buffered per channel until a
//! chunk is available.

use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::debug;

/// Input frames handed to rubato per call
const CHUNK_FRAMES: usize = 1024;

const CHANNELS: usize = 2;

/// Stereo resampler fed with interleaved samples
pub struct StreamResampler {
    inner: FastFixedIn<f32>,
    pending: [Vec<f32>; CHANNELS],
    input_rate: u32,
    output_rate: u32,
}

impl StreamResampler {
    pub fn new(input_rate: u32, output_rate: u32) -> Result<Self> {
        if input_rate == 0 || output_rate == 0 {
            return Err(Error::Decode(format!(
                "Cannot resample {}Hz to {}Hz",
                input_rate, output_rate
            )));
        }

        let inner = FastFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0,
            PolynomialDegree::Septic,
            CHUNK_FRAMES,
            CHANNELS,
        )
        .map_err(|e| Error::Decode(format!("Failed to create resampler: {}", e)))?;

        debug!("Resampling {}Hz -> {}Hz", input_rate, output_rate);

        Ok(Self {
            inner,
            pending: [Vec::new(), Vec::new()],
            input_rate,
            output_rate,
        })
    }

    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    pub fn output_rate(&self) -> u32 {
        self.output_rate
    }

    /// Resample as many whole chunks as the buffered input allows
    pub fn process(&mut self, interleaved: &[f32]) -> Result<Vec<f32>> {
        for frame in interleaved.chunks_exact(CHANNELS) {
            self.pending[0].push(frame[0]);
            self.pending[1].push(frame[1]);
        }

        let mut output = Vec::new();
        loop {
            let needed = self.inner.input_frames_next();
            if self.pending[0].len() < needed {
                break;
            }

            let input: [&[f32]; CHANNELS] = [&self.pending[0][..needed], &self.pending[1][..needed]];
            let planar = self
                .inner
                .process(&input[..], None)
                .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;

            for channel in self.pending.iter_mut() {
                channel.drain(..needed);
            }
            interleave_into(&planar, &mut output);
        }

        Ok(output)
    }

    /// Resample whatever is left at end of stream
    pub fn flush(&mut self) -> Result<Vec<f32>> {
        let mut output = Vec::new();
        if self.pending[0].is_empty() {
            return Ok(output);
        }

        let input: [&[f32]; CHANNELS] = [&self.pending[0], &self.pending[1]];
        let planar = self
            .inner
            .process_partial(Some(&input[..]), None)
            .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;

        for channel in self.pending.iter_mut() {
            channel.clear();
        }
        interleave_into(&planar, &mut output);
        Ok(output)
    }
}

fn interleave_into(planar: &[Vec<f32>], output: &mut Vec<f32>) {
    let frames = planar.first().map(Vec::len).unwrap_or(0);
    output.reserve(frames * CHANNELS);
    for i in 0..frames {
        output.push(planar[0][i]);
        output.push(planar[1][i]);
    }
}
