// tuner-core/src/lib.rs

//! The core logic for the guitar tuner.
//! This crate is responsible for audio capture, peak-frequency estimation,
//! the tuning decision and the session loop that ties them together. It is
//! completely headless: display, lights, buzzer and buttons are traits
//! implemented by the front end.

pub mod audio;
pub mod config;
pub mod error;
pub mod fft;
pub mod session;
pub mod tuning;

pub use audio::{SampleBuffer, SampleSource};
pub use config::TunerConfig;
pub use error::{Result, TunerError};
pub use fft::{FrequencyBinTable, SpectralEstimator};
pub use session::{
    AudibleSink, CycleOutcome, DisplaySink, FeedbackSinks, IndicatorSink, NavEvent,
    NavigationInput, TuningSession,
};
pub use tuning::{Note, TuningCatalog, TuningProfile, TuningStatus, Verdict};
