//! # Buzzer
//!
//! Plays reference tones as a 50% duty square wave, the same sound a PWM-driven
//! piezo buzzer makes. Both implementations block for the full tone duration.

use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{debug, error, info, warn};
use tuner_core::AudibleSink;

/// Output level of the square wave; keeps the tone well below full scale.
const VOLUME: f32 = 0.2;

/// Square wave oscillator with a 50% duty cycle.
#[derive(Debug, Clone)]
pub struct SquareWave {
    phase: f32,
    step: f32,
}

impl SquareWave {
    pub fn new(frequency_hz: f32, sample_rate: u32) -> Self {
        Self { phase: 0.0, step: frequency_hz / sample_rate as f32 }
    }

    /// Next sample, `+VOLUME` for the first half of each period and `-VOLUME` for the second.
    pub fn next_sample(&mut self) -> f32 {
        let value = if self.phase < 0.5 { VOLUME } else { -VOLUME };
        self.phase = (self.phase + self.step).fract();
        value
    }
}

/// Tone output through the default CPAL output device.
pub struct SquareWaveBuzzer {
    device: cpal::Device,
    config: cpal::StreamConfig,
}

impl SquareWaveBuzzer {
    /// Opens the default output device.
    ///
    /// # Returns
    /// * `Some(buzzer)` - Device with an f32 default configuration
    /// * `None` - No usable output device; callers fall back to `SilentBuzzer`
    pub fn from_default_device() -> Option<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device()?;
        let supported = match device.default_output_config() {
            Ok(config) => config,
            Err(e) => {
                warn!("No default output config: {}", e);
                return None;
            }
        };
        if supported.sample_format() != cpal::SampleFormat::F32 {
            warn!("Output device does not use f32 samples, buzzer disabled");
            return None;
        }
        if let Ok(name) = device.name() {
            info!("Using audio output device: {}", name);
        }
        Some(Self { device, config: supported.into() })
    }

    fn start_tone(&self, frequency_hz: f32) -> Result<cpal::Stream, String> {
        let channels = self.config.channels as usize;
        let mut wave = SquareWave::new(frequency_hz, self.config.sample_rate.0);
        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        let value = wave.next_sample();
                        frame.fill(value);
                    }
                },
                |err| error!("An error occurred on the output stream: {}", err),
                None,
            )
            .map_err(|e| e.to_string())?;
        stream.play().map_err(|e| e.to_string())?;
        Ok(stream)
    }
}

impl AudibleSink for SquareWaveBuzzer {
    fn play_tone(&mut self, frequency_hz: f32, duration: Duration) {
        debug!("Buzzer: {:.2} Hz for {:?}", frequency_hz, duration);
        match self.start_tone(frequency_hz) {
            Ok(stream) => {
                thread::sleep(duration);
                drop(stream);
            }
            Err(e) => {
                warn!("Failed to play tone: {}", e);
                thread::sleep(duration);
            }
        }
    }
}

/// Keeps the buzzer's timing without making a sound.
pub struct SilentBuzzer;

impl AudibleSink for SilentBuzzer {
    fn play_tone(&mut self, frequency_hz: f32, duration: Duration) {
        debug!("Buzzer muted: {:.2} Hz for {:?}", frequency_hz, duration);
        thread::sleep(duration);
    }
}
