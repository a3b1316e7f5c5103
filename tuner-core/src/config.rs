//! # Configuration Module
//!
//! Runtime settings for the tuner. Every field has a default matching the
//! reference hardware (8 kHz capture, 1024-point transform, 8 Hz tolerance),
//! so an empty JSON object is a valid configuration file.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TunerError};

/// Capture rate of the reference hardware in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 8000;

/// Number of samples per capture (and transform length).
///
/// 1024 samples at 8 kHz gives 7.8125 Hz per bin and 128 ms of audio per cycle.
pub const DEFAULT_FFT_SIZE: usize = 1024;

/// Tolerance in Hz, measured experimentally on a guitar.
pub const DEFAULT_TOLERANCE_HZ: f32 = 8.0;

/// Tuner settings, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Fixed capture rate in Hz.
    pub sample_rate: u32,
    /// Samples per capture. Must be a power of two.
    pub fft_size: usize,
    /// Half-width of the in-tune band in Hz.
    pub tolerance_hz: f32,
    /// Pause between monitoring cycles.
    pub poll_interval_ms: u64,
    /// Pause between polls of the profile menu.
    pub menu_poll_ms: u64,
    /// How long the welcome screen stays up.
    pub welcome_ms: u64,
    /// Duration of the reference and in-tune tones.
    pub tone_duration_ms: u64,
    /// Profile highlighted when the menu opens.
    pub default_profile: usize,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            fft_size: DEFAULT_FFT_SIZE,
            tolerance_hz: DEFAULT_TOLERANCE_HZ,
            poll_interval_ms: 200,
            menu_poll_ms: 100,
            welcome_ms: 5000,
            tone_duration_ms: 2000,
            default_profile: 0,
        }
    }
}

impl TunerConfig {
    /// Loads a configuration from a JSON file and validates it.
    ///
    /// Missing fields fall back to their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut data = String::new();
        file.read_to_string(&mut data)?;
        let config: TunerConfig = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the pipeline relies on.
    ///
    /// The default profile is checked later, against the catalog actually in use.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(TunerError::Config("sample_rate must be positive".into()));
        }
        if self.fft_size < 2 || !self.fft_size.is_power_of_two() {
            return Err(TunerError::Config(format!(
                "fft_size must be a power of two >= 2, got {}",
                self.fft_size
            )));
        }
        if !self.tolerance_hz.is_finite() || self.tolerance_hz < 0.0 {
            return Err(TunerError::Config(format!(
                "tolerance_hz must be a non-negative number, got {}",
                self.tolerance_hz
            )));
        }
        Ok(())
    }

    /// Width of one frequency bin in Hz.
    pub fn resolution_hz(&self) -> f32 {
        self.sample_rate as f32 / self.fft_size as f32
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn menu_poll(&self) -> Duration {
        Duration::from_millis(self.menu_poll_ms)
    }

    pub fn welcome(&self) -> Duration {
        Duration::from_millis(self.welcome_ms)
    }

    pub fn tone_duration(&self) -> Duration {
        Duration::from_millis(self.tone_duration_ms)
    }
}
