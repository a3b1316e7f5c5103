//! # Terminal Display
//!
//! Renders the tuner screens as eight short text rows, the layout of a small
//! 128x64 OLED, so the same screens work on the device and in a terminal.
//!
//! ## Screens
//! - Welcome splash
//! - Tuning menu with the highlighted profile marked
//! - Listening screen with the string to tune and its target
//! - Reading screen with the detected frequency, verdict and cent offset

use std::io::Write;

use log::warn;
use tuner_core::session::DisplaySink;
use tuner_core::tuning::{calculate_cents_deviation, TuningProfile};
use tuner_core::{Note, TuningStatus, Verdict};

/// Rows on the screen.
pub const SCREEN_ROWS: usize = 8;

/// A screen drawn as text rows on any writer.
pub struct TerminalDisplay<W: Write> {
    out: W,
}

impl<W: Write> TerminalDisplay<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Gives the writer back, mainly for inspecting rendered output.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(&mut self, rows: [String; SCREEN_ROWS]) {
        let mut frame = String::from("----------------\n");
        for row in rows.iter() {
            frame.push_str(row);
            frame.push('\n');
        }
        if let Err(e) = self.out.write_all(frame.as_bytes()).and_then(|_| self.out.flush()) {
            warn!("Failed to draw screen: {}", e);
        }
    }
}

/// Short hint for the player, one per verdict.
pub fn status_hint(status: TuningStatus) -> &'static str {
    match status {
        TuningStatus::TooLow => "too loose",
        TuningStatus::InTune => "in tune",
        TuningStatus::TooHigh => "too tight",
    }
}

impl<W: Write> DisplaySink for TerminalDisplay<W> {
    fn show_welcome(&mut self) {
        self.render([
            "  Welcome".into(),
            String::new(),
            String::new(),
            "   Guitar Tuner".into(),
            String::new(),
            String::new(),
            String::new(),
            String::new(),
        ]);
    }

    fn show_menu(&mut self, profiles: &[TuningProfile], highlighted: usize) {
        let mut rows: [String; SCREEN_ROWS] = Default::default();
        rows[0] = "    Tuning".into();
        // Rows 2..=5 list profiles; longer catalogs scroll with the highlight.
        let visible = 4;
        let first = highlighted.saturating_sub(visible - 1);
        for (row, (index, profile)) in rows[2..2 + visible]
            .iter_mut()
            .zip(profiles.iter().enumerate().skip(first))
        {
            let marker = if index == highlighted { '>' } else { ' ' };
            *row = format!("{} {}", marker, profile.name);
        }
        rows[6] = "b to nav".into();
        rows[7] = "a to select".into();
        self.render(rows);
    }

    fn show_listening(&mut self, note: Note) {
        let mut rows: [String; SCREEN_ROWS] = Default::default();
        rows[0] = "   hearing....".into();
        rows[2] = format!("Tune {}", note.label);
        rows[4] = format!("Target {:.2} Hz", note.frequency);
        self.render(rows);
    }

    fn show_reading(&mut self, note: Note, verdict: &Verdict) {
        let cents = calculate_cents_deviation(verdict.detected_hz, verdict.target_hz);
        let mut rows: [String; SCREEN_ROWS] = Default::default();
        rows[2] = format!("Tune {}", note.label);
        rows[4] = format!("Target {:.2} Hz", verdict.target_hz);
        rows[5] = status_hint(verdict.status).into();
        if cents.is_finite() {
            rows[6] = format!("{:+.0} cents", cents);
        }
        rows[7] = format!("heard {:.2} Hz", verdict.detected_hz);
        self.render(rows);
    }
}
