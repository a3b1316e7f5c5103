//! # Keyboard Navigation
//!
//! Maps typed commands onto the tuner's two buttons. A background thread reads
//! stdin line by line and forwards presses over a crossbeam channel; the
//! session polls the channel without blocking.
//!
//! - `b` + Enter: navigate (next profile in the menu, next string while tuning)
//! - `a` + Enter: select the highlighted profile

use std::io::BufRead;
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use log::{debug, info};
use tuner_core::{NavEvent, NavigationInput};

/// Parses one line of keyboard input into a button press.
pub fn parse_command(line: &str) -> Option<NavEvent> {
    match line.trim().to_ascii_lowercase().as_str() {
        "b" | "n" | "next" => Some(NavEvent::AdvanceString),
        "a" | "s" | "select" => Some(NavEvent::ConfirmSelection),
        _ => None,
    }
}

/// Button presses arriving over a channel.
pub struct KeyboardNavigation {
    receiver: Receiver<NavEvent>,
}

impl KeyboardNavigation {
    pub fn new(receiver: Receiver<NavEvent>) -> Self {
        Self { receiver }
    }

    /// Spawns the stdin reader thread and returns the matching input.
    pub fn spawn_stdin() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        thread::spawn(move || read_commands(std::io::stdin().lock(), tx));
        Self::new(rx)
    }
}

fn read_commands<R: BufRead>(input: R, sender: Sender<NavEvent>) {
    for line in input.lines() {
        let Ok(line) = line else { break };
        match parse_command(&line) {
            Some(event) => {
                if sender.send(event).is_err() {
                    break;
                }
            }
            None => debug!("Ignoring input {:?}", line),
        }
    }
    info!("Keyboard input closed");
}

impl NavigationInput for KeyboardNavigation {
    fn poll(&mut self) -> Option<NavEvent> {
        self.receiver.try_recv().ok()
    }
}
