//! # Fast Fourier Transform (FFT) Module
//!
//! This module estimates the dominant frequency of a captured sample block.
//! It removes the DC offset, runs a real-input FFT and picks the bin with the
//! most power.
//!
//! ## Features
//! - Real-to-complex FFT via realfft (only the non-redundant half is computed)
//! - Transform planned once; scratch buffers reused every cycle
//! - Precomputed bin-to-frequency table
//! - Power accumulated in `f64`
//!
//! No window is applied and no sub-bin interpolation is done, so the result is
//! quantised to `sample_rate / N` Hz.

use std::sync::Arc;

use log::debug;
use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};

use crate::audio::SampleBuffer;
use crate::error::{Result, TunerError};

/// Frequency in Hz of each of the N/2 usable FFT bins.
///
/// `frequency(i) = i * sample_rate / N`. Built once and never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyBinTable {
    frequencies: Vec<f32>,
    resolution: f32,
}

impl FrequencyBinTable {
    /// Builds the table for an `fft_size`-point transform at `sample_rate` Hz.
    pub fn new(sample_rate: u32, fft_size: usize) -> Self {
        let resolution = sample_rate as f32 / fft_size as f32;
        let frequencies = (0..fft_size / 2).map(|i| resolution * i as f32).collect();
        Self { frequencies, resolution }
    }

    /// Frequency of `bin` in Hz.
    ///
    /// # Panics
    /// * If `bin >= self.len()`
    pub fn frequency(&self, bin: usize) -> f32 {
        self.frequencies[bin]
    }

    /// Bin whose frequency is closest to `freq`, clamped to the table.
    pub fn nearest_bin(&self, freq: f32) -> usize {
        let bin = (freq / self.resolution).round().max(0.0) as usize;
        bin.min(self.frequencies.len().saturating_sub(1))
    }

    pub fn frequencies(&self) -> &[f32] {
        &self.frequencies
    }

    /// Width of one bin in Hz.
    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }
}

/// Peak-bin frequency estimator.
///
/// Owns its planned transform and working memory, so `estimate` performs no
/// allocation.
pub struct SpectralEstimator {
    fft_size: usize,
    r2c: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    bins: FrequencyBinTable,
}

impl SpectralEstimator {
    /// Plans an `fft_size`-point real FFT and allocates its buffers.
    pub fn new(sample_rate: u32, fft_size: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let r2c = planner.plan_fft_forward(fft_size);
        let input = r2c.make_input_vec();
        let spectrum = r2c.make_output_vec();
        Self {
            fft_size,
            r2c,
            input,
            spectrum,
            bins: FrequencyBinTable::new(sample_rate, fft_size),
        }
    }

    pub fn bins(&self) -> &FrequencyBinTable {
        &self.bins
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Returns the frequency of the strongest bin in `buffer`.
    ///
    /// # Arguments
    /// * `buffer` - Exactly `fft_size` samples
    ///
    /// # Returns
    /// * `Ok(freq)` - Frequency in Hz of the bin with maximum power
    /// * `Err(e)` - Wrong buffer length or transform failure; drop the cycle
    pub fn estimate(&mut self, buffer: &SampleBuffer) -> Result<f32> {
        if buffer.len() != self.fft_size {
            return Err(TunerError::BufferLength {
                expected: self.fft_size,
                actual: buffer.len(),
            });
        }

        remove_dc_offset(buffer.samples(), &mut self.input);

        self.r2c
            .process(&mut self.input, &mut self.spectrum)
            .map_err(|e| TunerError::Spectrum(e.to_string()))?;

        let peak = peak_bin(&self.spectrum[..self.fft_size / 2]);
        let freq = self.bins.frequency(peak);
        debug!("Detected frequency: {:.2} Hz (bin {})", freq, peak);
        Ok(freq)
    }
}

/// Writes `samples - mean(samples)` into `out`.
///
/// The sum is taken in `u64`, so it cannot overflow for any buffer length.
fn remove_dc_offset(samples: &[u8], out: &mut [f32]) {
    let sum: u64 = samples.iter().map(|&s| s as u64).sum();
    let avg = sum as f32 / samples.len() as f32;
    for (value, &sample) in out.iter_mut().zip(samples) {
        *value = sample as f32 - avg;
    }
}

/// Index of the bin with the largest power.
///
/// Uses a strict `>` so the first of several equal maxima wins, and bin 0 wins
/// when every bin has zero power.
fn peak_bin(spectrum: &[Complex<f32>]) -> usize {
    let mut max_power = 0.0_f64;
    let mut max_idx = 0;
    for (i, c) in spectrum.iter().enumerate() {
        let re = c.re as f64;
        let im = c.im as f64;
        let power = re * re + im * im;
        if power > max_power {
            max_power = power;
            max_idx = i;
        }
    }
    max_idx
}
