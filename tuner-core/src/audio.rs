//! # Audio Capture Module
//!
//! This module turns a continuous analog input into fixed-size blocks of
//! 8-bit unsigned samples, the same shape an ADC FIFO delivers on the
//! reference hardware.
//!
//! ## Features
//! - `SampleBuffer`: an owned block of exactly N samples
//! - `SampleSource` trait with buffer recycling, so storage is reused every cycle
//! - `CpalSampleSource`: microphone capture through CPAL, paused between captures
//! - `SineSource`: deterministic synthetic tone for tests and demos

use std::f64::consts::PI;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SupportedStreamConfigRange;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, error, info, warn};

#[cfg(test)]
use mockall::automock;

use crate::error::{Result, TunerError};

/// One raw amplitude sample. Mid-scale (128) is silence.
pub type Sample = u8;

/// Value of a silent input.
pub const MID_SCALE: Sample = 128;

/// How long a capture waits for audio before restarting the stream.
const CAPTURE_WATCHDOG: Duration = Duration::from_secs(1);

/// An owned block of exactly N contiguous samples.
///
/// The length is fixed at construction; the contents are overwritten in place
/// by the source that owns the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleBuffer {
    samples: Box<[Sample]>,
}

impl SampleBuffer {
    /// A buffer of `len` mid-scale samples.
    pub fn silent(len: usize) -> Self {
        Self { samples: vec![MID_SCALE; len].into_boxed_slice() }
    }

    /// Wraps captured samples, checking the length against `expected`.
    pub fn from_samples(samples: Vec<Sample>, expected: usize) -> Result<Self> {
        if samples.len() != expected {
            return Err(TunerError::BufferLength { expected, actual: samples.len() });
        }
        Ok(Self { samples: samples.into_boxed_slice() })
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [Sample] {
        &mut self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Produces fixed-length sample blocks at a fixed sample rate.
#[cfg_attr(test, automock)]
pub trait SampleSource {
    /// Blocks until a fresh block of N samples has been captured.
    ///
    /// Anything buffered before the call is discarded, so the block only
    /// contains sound that arrived after the call began.
    fn capture(&mut self) -> SampleBuffer;

    /// Hands a consumed buffer back so the next capture can reuse its storage.
    fn recycle(&mut self, _buffer: SampleBuffer) {}
}

/// Converts a float sample in `[-1, 1]` to an unsigned 8-bit sample.
pub fn quantize(sample: f32) -> Sample {
    let scaled = (sample.clamp(-1.0, 1.0) + 1.0) * 127.5;
    scaled.round() as Sample
}

/// Microphone capture through the default CPAL input device.
///
/// The stream only runs while `capture()` is waiting for samples.
pub struct CpalSampleSource {
    stream: cpal::Stream,
    receiver: Receiver<Vec<f32>>,
    fft_size: usize,
    spare: Option<SampleBuffer>,
}

impl CpalSampleSource {
    /// Opens the default input device at `sample_rate` and prepares a paused stream.
    ///
    /// # Arguments
    /// * `sample_rate` - Capture rate in Hz; the device must support it exactly
    /// * `fft_size` - Number of samples per capture
    ///
    /// # Returns
    /// * `Ok(source)` - Ready source with its stream paused
    /// * `Err(e)` - No device, no matching configuration, or stream setup failure
    pub fn new(sample_rate: u32, fft_size: usize) -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(TunerError::NoInputDevice)?;
        let name = device.name().map_err(|e| TunerError::Device(e.to_string()))?;
        info!("Using audio input device: {}", name);

        let configs = device
            .supported_input_configs()
            .map_err(|e| TunerError::Device(e.to_string()))?
            .collect::<Vec<_>>();
        let supported_config = find_supported_config(configs, sample_rate)
            .ok_or(TunerError::UnsupportedSampleRate(sample_rate))?;

        let config = supported_config.with_sample_rate(cpal::SampleRate(sample_rate));
        let channels = config.channels() as usize;
        let config: cpal::StreamConfig = config.into();
        info!("Capturing {} Hz, {} channel(s), first channel only", sample_rate, channels);

        let (sender, receiver) = crossbeam_channel::unbounded::<Vec<f32>>();
        let err_fn = |err| error!("An error occurred on the audio stream: {}", err);

        let stream = device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let mono: Vec<f32> = data.iter().step_by(channels).copied().collect();
                // The receiver only goes away together with the stream.
                let _ = sender.send(mono);
            },
            err_fn,
            None,
        )?;
        stream.pause()?;

        Ok(Self { stream, receiver, fft_size, spare: None })
    }

    fn drain_stale(&self) {
        let stale = self.receiver.try_iter().count();
        if stale > 0 {
            debug!("Discarded {} stale audio chunk(s)", stale);
        }
    }

    fn fill(&mut self, buffer: &mut SampleBuffer) {
        let mut filled = 0;
        while filled < self.fft_size {
            match self.receiver.recv_timeout(CAPTURE_WATCHDOG) {
                Ok(chunk) => {
                    let take = chunk.len().min(self.fft_size - filled);
                    for (slot, &sample) in buffer.samples_mut()[filled..filled + take]
                        .iter_mut()
                        .zip(&chunk[..take])
                    {
                        *slot = quantize(sample);
                    }
                    filled += take;
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!("No audio for {:?}, restarting input stream", CAPTURE_WATCHDOG);
                    if let Err(e) = self.stream.play() {
                        error!("Failed to restart input stream: {}", e);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    error!("Audio input disconnected, delivering silence");
                    buffer.samples_mut()[filled..].fill(MID_SCALE);
                    return;
                }
            }
        }
    }
}

impl SampleSource for CpalSampleSource {
    fn capture(&mut self) -> SampleBuffer {
        let mut buffer = self
            .spare
            .take()
            .unwrap_or_else(|| SampleBuffer::silent(self.fft_size));

        self.drain_stale();
        if let Err(e) = self.stream.play() {
            error!("Failed to start input stream: {}", e);
        }
        self.fill(&mut buffer);
        if let Err(e) = self.stream.pause() {
            warn!("Failed to pause input stream: {}", e);
        }
        buffer
    }

    fn recycle(&mut self, buffer: SampleBuffer) {
        if buffer.len() == self.fft_size {
            self.spare = Some(buffer);
        }
    }
}

/// Finds an f32 input configuration whose rate range contains `target_rate`.
///
/// Mono configurations are preferred; with several channels only the first is used.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .filter(|c| c.min_sample_rate().0 <= target_rate && target_rate <= c.max_sample_rate().0)
        .min_by_key(|c| c.channels())
}

/// Synthetic sinusoid quantised like the ADC would deliver it.
///
/// Phase carries over between captures, as it would for a real string.
#[derive(Debug, Clone)]
pub struct SineSource {
    frequency: f64,
    amplitude: f64,
    bias: f64,
    sample_rate: f64,
    fft_size: usize,
    position: u64,
    spare: Option<SampleBuffer>,
}

impl SineSource {
    /// A tone at `frequency` Hz using most of the 8-bit range around mid-scale.
    pub fn new(frequency: f32, sample_rate: u32, fft_size: usize) -> Self {
        Self::with_shape(frequency, 100.0, MID_SCALE as f32, sample_rate, fft_size)
    }

    /// A tone with explicit amplitude and DC bias, both in sample units.
    pub fn with_shape(frequency: f32, amplitude: f32, bias: f32, sample_rate: u32, fft_size: usize) -> Self {
        Self {
            frequency: frequency as f64,
            amplitude: amplitude as f64,
            bias: bias as f64,
            sample_rate: sample_rate as f64,
            fft_size,
            position: 0,
            spare: None,
        }
    }

    pub fn set_frequency(&mut self, frequency: f32) {
        self.frequency = frequency as f64;
    }
}

impl SampleSource for SineSource {
    fn capture(&mut self) -> SampleBuffer {
        let mut buffer = self
            .spare
            .take()
            .unwrap_or_else(|| SampleBuffer::silent(self.fft_size));
        for slot in buffer.samples_mut() {
            let t = self.position as f64 / self.sample_rate;
            let value = self.bias + self.amplitude * (2.0 * PI * self.frequency * t).sin();
            *slot = value.round().clamp(0.0, 255.0) as Sample;
            self.position += 1;
        }
        buffer
    }

    fn recycle(&mut self, buffer: SampleBuffer) {
        if buffer.len() == self.fft_size {
            self.spare = Some(buffer);
        }
    }
}
