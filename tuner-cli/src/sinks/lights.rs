//! # Terminal Lights
//!
//! Stand-in for the three indicator LEDs: blue (loose), green (ok) and red (tight).

use std::io::Write;

use log::warn;
use tuner_core::session::{IndicatorLights, IndicatorSink};
use tuner_core::TuningStatus;

pub struct TerminalLights<W: Write> {
    out: W,
    lights: IndicatorLights,
}

impl<W: Write> TerminalLights<W> {
    pub fn new(out: W) -> Self {
        Self { out, lights: IndicatorLights::default() }
    }

    /// Current state of the three outputs.
    pub fn lights(&self) -> IndicatorLights {
        self.lights
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

fn lamp(on: bool, name: &str) -> String {
    if on { format!("[*{}*]", name) } else { format!("[ {} ]", name) }
}

impl<W: Write> IndicatorSink for TerminalLights<W> {
    fn indicate(&mut self, status: TuningStatus) {
        self.lights = IndicatorLights::for_status(status);
        let line = format!(
            "{} {} {}\n",
            lamp(self.lights.loose, "LOOSE"),
            lamp(self.lights.ok, "OK"),
            lamp(self.lights.tight, "TIGHT")
        );
        if let Err(e) = self.out.write_all(line.as_bytes()) {
            warn!("Failed to update lights: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_matching_lamp_is_lit() {
        let mut lights = TerminalLights::new(Vec::new());
        lights.indicate(TuningStatus::TooHigh);
        assert_eq!(lights.lights(), IndicatorLights { loose: false, ok: false, tight: true });
        lights.indicate(TuningStatus::InTune);
        assert_eq!(lights.lights(), IndicatorLights { loose: false, ok: true, tight: false });

        let text = String::from_utf8(lights.into_inner()).unwrap();
        let last = text.lines().last().unwrap();
        assert_eq!(last, "[ LOOSE ] [*OK*] [ TIGHT ]");
    }
}
