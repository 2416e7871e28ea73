//! Audio output using cpal
//!
//! Every playback gets its own thread: the cpal `Stream` is not `Send`, so
//! the thread that builds it also feeds it and drops it. Decoded frames
//! reach the device callback through a ring buffer; the callback plays
//! silence while paused.

use super::{AudioBackend, PlaybackControl, StreamResampler, StreamingDecoder};
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use std::path::Path;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

type StereoFrame = [f32; 2];

/// Frames buffered between decoder and device (about 1.5s at 44.1kHz)
const RING_CAPACITY_FRAMES: usize = 65_536;

/// Producer back-off while the ring buffer is full or playback is paused
const FEED_WAIT: Duration = Duration::from_millis(10);

/// Allowance for the device's own buffer to play out before the stream is dropped
const DEVICE_DRAIN: Duration = Duration::from_millis(200);

/// An opened output device and the stream configuration chosen for it
pub struct AudioOutput {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
}

impl AudioOutput {
    /// Names of the host's output devices
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Open the named device (or the default one) for a file at `source_rate`
    ///
    /// An unknown device name falls back to the default device.
    pub fn open(device_name: Option<&str>, source_rate: u32) -> Result<Self> {
        let host = cpal::default_host();

        let device = match device_name {
            Some(name) => {
                let found = host
                    .output_devices()
                    .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
                    .find(|d| d.name().ok().as_deref() == Some(name));

                match found {
                    Some(device) => device,
                    None => {
                        warn!("Requested device '{}' not found, falling back to default device", name);
                        host.default_output_device().ok_or_else(|| {
                            Error::AudioOutput(format!(
                                "Device '{}' not found and no default device available",
                                name
                            ))
                        })?
                    }
                }
            }
            None => host
                .default_output_device()
                .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?,
        };

        let (config, sample_format) = Self::choose_config(&device, source_rate)?;

        info!(
            device = %device.name().unwrap_or_else(|_| "Unknown".to_string()),
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            format = ?sample_format,
            "Audio output opened"
        );

        Ok(Self {
            device,
            config,
            sample_format,
        })
    }

    /// Prefer stereo f32 at the file's own rate so no resampling is needed
    fn choose_config(device: &Device, source_rate: u32) -> Result<(StreamConfig, SampleFormat)> {
        let mut supported = device
            .supported_output_configs()
            .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?;

        let preferred = supported.find(|config| {
            config.channels() == 2
                && config.min_sample_rate().0 <= source_rate
                && config.max_sample_rate().0 >= source_rate
                && config.sample_format() == SampleFormat::F32
        });

        if let Some(config) = preferred {
            let config = config.with_sample_rate(cpal::SampleRate(source_rate));
            return Ok((config.config(), config.sample_format()));
        }

        let default = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;

        Ok((default.config(), default.sample_format()))
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Build and start a stream that drains `consumer`
    fn start(&self, consumer: HeapCons<StereoFrame>, control: Arc<PlaybackControl>) -> Result<Stream> {
        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(consumer, control)?,
            SampleFormat::I16 => self.build_stream::<i16>(consumer, control)?,
            SampleFormat::U16 => self.build_stream::<u16>(consumer, control)?,
            sample_format => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {:?}",
                    sample_format
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;

        Ok(stream)
    }

    fn build_stream<T>(
        &self,
        mut consumer: HeapCons<StereoFrame>,
        control: Arc<PlaybackControl>,
    ) -> Result<Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let channels = self.config.channels as usize;
        let error_control = Arc::clone(&control);

        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let silent = control.is_paused() || control.is_stopped();
                    let mut played = 0u64;

                    for frame in data.chunks_mut(channels) {
                        let [left, right] = if silent {
                            [0.0, 0.0]
                        } else {
                            match consumer.try_pop() {
                                Some(samples) => {
                                    played += 1;
                                    samples
                                }
                                None => [0.0, 0.0],
                            }
                        };

                        if channels == 1 {
                            frame[0] = T::from_sample((left + right) * 0.5);
                        } else {
                            frame[0] = T::from_sample(left);
                            frame[1] = T::from_sample(right);
                            for extra in frame.iter_mut().skip(2) {
                                *extra = T::EQUILIBRIUM;
                            }
                        }
                    }

                    control.add_frames(played);
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                    if matches!(err, cpal::StreamError::DeviceNotAvailable) {
                        error_control.fail(format!("Audio device lost: {}", err));
                    }
                },
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
    }
}

/// cpal-backed [`AudioBackend`]
#[derive(Debug, Clone, Default)]
pub struct CpalBackend {
    device_name: Option<String>,
}

impl CpalBackend {
    pub fn new(device_name: Option<String>) -> Self {
        Self { device_name }
    }
}

impl AudioBackend for CpalBackend {
    fn play(&self, path: &Path) -> Result<Arc<PlaybackControl>> {
        let decoder = StreamingDecoder::open(path)?;
        let control = Arc::new(PlaybackControl::new());

        let (ready_tx, ready_rx) = mpsc::channel();
        let thread_control = Arc::clone(&control);
        let device_name = self.device_name.clone();

        thread::Builder::new()
            .name("gdp-playback".to_string())
            .spawn(move || {
                run_playback(decoder, device_name.as_deref(), &thread_control, ready_tx);
                thread_control.mark_finished();
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(control),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::AudioOutput(
                "Playback thread exited during startup".to_string(),
            )),
        }
    }
}

fn run_playback(
    mut decoder: StreamingDecoder,
    device_name: Option<&str>,
    control: &Arc<PlaybackControl>,
    ready: mpsc::Sender<Result<()>>,
) {
    let output = match AudioOutput::open(device_name, decoder.sample_rate()) {
        Ok(output) => output,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    let mut resampler = if output.sample_rate() != decoder.sample_rate() {
        match StreamResampler::new(decoder.sample_rate(), output.sample_rate()) {
            Ok(resampler) => Some(resampler),
            Err(e) => {
                let _ = ready.send(Err(e));
                return;
            }
        }
    } else {
        None
    };

    let (mut producer, consumer) = HeapRb::<StereoFrame>::new(RING_CAPACITY_FRAMES).split();

    let stream = match output.start(consumer, Arc::clone(control)) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    control.set_sample_rate(output.sample_rate());
    let _ = ready.send(Ok(()));

    loop {
        if control.is_stopped() || control.failure().is_some() {
            break;
        }

        let samples = match decoder.next_chunk() {
            Ok(Some(samples)) => samples,
            Ok(None) => {
                if let Some(resampler) = resampler.as_mut() {
                    match resampler.flush() {
                        Ok(tail) => feed(&mut producer, &tail, control),
                        Err(e) => control.fail(e.to_string()),
                    }
                }
                break;
            }
            Err(e) => {
                control.fail(e.to_string());
                break;
            }
        };

        let samples = match resampler.as_mut() {
            Some(resampler) => match resampler.process(&samples) {
                Ok(resampled) => resampled,
                Err(e) => {
                    control.fail(e.to_string());
                    break;
                }
            },
            None => samples,
        };

        feed(&mut producer, &samples, control);
    }

    control.mark_decode_done();
    debug!("Decoding complete, draining output buffer");

    wait_for_drain(&producer, control);
    if !control.is_stopped() {
        thread::sleep(DEVICE_DRAIN);
    }

    drop(stream);
    debug!("Audio stream closed");
}

/// Push interleaved stereo samples, waiting for room; gives up on stop or failure
fn feed(producer: &mut HeapProd<StereoFrame>, samples: &[f32], control: &PlaybackControl) {
    let frames: Vec<StereoFrame> = samples
        .chunks_exact(2)
        .map(|pair| [pair[0], pair[1]])
        .collect();

    let mut offset = 0;
    while offset < frames.len() {
        if control.is_stopped() || control.failure().is_some() {
            return;
        }
        let pushed = producer.push_slice(&frames[offset..]);
        offset += pushed;
        if offset < frames.len() {
            thread::sleep(FEED_WAIT);
        }
    }
}

/// Wait for the device to consume everything buffered; gives up on stop or failure
fn wait_for_drain(producer: &HeapProd<StereoFrame>, control: &PlaybackControl) {
    while !control.is_stopped() && control.failure().is_none() && producer.occupied_len() > 0 {
        thread::sleep(FEED_WAIT);
    }
}
