//! # Error Module
//!
//! A single error type for everything the tuner core can report. Audio device
//! problems and configuration mistakes are fatal at startup; spectrum errors
//! only ever drop the current cycle.

use thiserror::Error;

/// Errors raised by the tuner core.
#[derive(Debug, Error)]
pub enum TunerError {
    #[error("No audio input device available")]
    NoInputDevice,

    #[error("Audio device error: {0}")]
    Device(String),

    #[error("No f32 input configuration supports {0} Hz")]
    UnsupportedSampleRate(u32),

    #[error("Failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Failed to pause audio stream: {0}")]
    PauseStream(#[from] cpal::PauseStreamError),

    #[error("Sample buffer holds {actual} samples, expected {expected}")]
    BufferLength { expected: usize, actual: usize },

    #[error("Spectral transform failed: {0}")]
    Spectrum(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid tuning catalog: {0}")]
    Catalog(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TunerError>;
