//! # Guitar Tuning Module
//!
//! This module holds the catalog of guitar tunings and the decision rule that
//! turns a detected frequency into a verdict for the player.
//!
//! ## Features
//! - Built-in catalog of six-string tunings (E-Standard, Drop D, Drop C)
//! - Optional catalog replacement from a JSON file at startup
//! - Tri-state tolerance check (too low / in tune / too high)
//! - Cent deviation for a finer readout on the display

use std::fs::File;
use std::io::Read;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TunerError};

/// Number of strings every tuning profile describes.
pub const STRING_COUNT: usize = 6;

/// A single open-string target: its note letter and frequency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Note letter shown to the player (e.g. 'E', 'A').
    pub label: char,
    /// Target frequency in Hz.
    pub frequency: f32,
}

/// One alternate tuning: six string targets, lowest string first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningProfile {
    pub name: String,
    pub notes: [Note; STRING_COUNT],
}

impl TuningProfile {
    fn from_table(name: &str, labels: [char; STRING_COUNT], frequencies: [f32; STRING_COUNT]) -> Self {
        let mut notes = [Note { label: ' ', frequency: 0.0 }; STRING_COUNT];
        for (note, (label, frequency)) in notes.iter_mut().zip(labels.into_iter().zip(frequencies)) {
            *note = Note { label, frequency };
        }
        Self { name: name.to_string(), notes }
    }

    /// Target note for a string. `string_index` is reduced modulo six.
    pub fn note(&self, string_index: usize) -> Note {
        self.notes[string_index % STRING_COUNT]
    }
}

/// Statically built catalog of the tunings shipped with the tuner.
///
/// Order matters: the menu lists profiles in this order and index 0 is the
/// power-on default.
static BUILTIN_PROFILES: Lazy<Vec<TuningProfile>> = Lazy::new(|| {
    vec![
        TuningProfile::from_table(
            "E-Standard",
            ['E', 'A', 'D', 'G', 'B', 'E'],
            [82.41, 110.00, 146.83, 196.00, 246.94, 329.63],
        ),
        TuningProfile::from_table(
            "Drop D",
            ['D', 'A', 'D', 'G', 'B', 'E'],
            [73.42, 110.00, 146.83, 196.00, 246.94, 329.63],
        ),
        TuningProfile::from_table(
            "Drop C",
            ['C', 'G', 'C', 'F', 'A', 'D'],
            [65.41, 98.00, 130.81, 174.61, 220.00, 293.66],
        ),
    ]
});

/// Read-only collection of tuning profiles, selected by index.
#[derive(Debug, Clone, PartialEq)]
pub struct TuningCatalog {
    profiles: Vec<TuningProfile>,
}

impl Default for TuningCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TuningCatalog {
    /// The catalog compiled into the tuner.
    pub fn builtin() -> Self {
        Self { profiles: BUILTIN_PROFILES.clone() }
    }

    /// Builds a catalog from explicit profiles, rejecting an empty list.
    ///
    /// The string count of each profile is enforced by its type.
    pub fn new(profiles: Vec<TuningProfile>) -> Result<Self> {
        if profiles.is_empty() {
            return Err(TunerError::Catalog("catalog has no profiles".into()));
        }
        Ok(Self { profiles })
    }

    /// Loads a catalog from a JSON array of profiles.
    ///
    /// Deserialization fails on any profile that does not list exactly six notes.
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut data = String::new();
        file.read_to_string(&mut data)?;
        let profiles: Vec<TuningProfile> = serde_json::from_str(&data)?;
        Self::new(profiles)
    }

    pub fn profiles(&self) -> &[TuningProfile] {
        &self.profiles
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Profile by index, reduced modulo the catalog size.
    pub fn profile(&self, index: usize) -> &TuningProfile {
        &self.profiles[index % self.profiles.len()]
    }
}

/// Which way the string is off, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TuningStatus {
    /// String too loose; tighten it.
    TooLow,
    InTune,
    /// String too tight; loosen it.
    TooHigh,
}

/// The outcome of one tuning cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub status: TuningStatus,
    pub detected_hz: f32,
    pub target_hz: f32,
}

/// Classifies a detected frequency against a target.
///
/// The comparisons are strict, so a reading exactly `tolerance` away from the
/// target still counts as in tune.
///
/// # Arguments
/// * `detected` - Detected frequency in Hz
/// * `target` - Target frequency in Hz
/// * `tolerance` - Allowed deviation in Hz on either side
pub fn evaluate(detected: f32, target: f32, tolerance: f32) -> Verdict {
    let status = if detected > target + tolerance {
        TuningStatus::TooHigh
    } else if detected < target - tolerance {
        TuningStatus::TooLow
    } else {
        TuningStatus::InTune
    };
    Verdict { status, detected_hz: detected, target_hz: target }
}

/// Calculates the deviation from a target frequency in cents.
///
/// Positive values are sharp, negative values flat. 100 cents make a semitone.
pub fn calculate_cents_deviation(freq: f32, target_freq: f32) -> f32 {
    1200.0 * (freq / target_freq).log2()
}
