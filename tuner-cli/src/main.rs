//! # Guitar Tuner - Terminal Front End
//!
//! Wires the tuner core to a microphone, a text display, indicator lamps, a
//! buzzer and keyboard buttons, then runs the tuning session forever.
//!
//! ## Architecture
//! - **Main Thread**: the tuning session (capture → estimate → evaluate → notify)
//! - **Input Thread**: reads keyboard commands and forwards button presses
//! - **Communication**: Crossbeam channel from the input thread to the session

mod navigation;
mod sinks;

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use tuner_core::audio::{CpalSampleSource, SineSource};
use tuner_core::{AudibleSink, FeedbackSinks, SampleSource, TunerConfig, TuningCatalog, TuningSession};

use navigation::KeyboardNavigation;
use sinks::buzzer::{SilentBuzzer, SquareWaveBuzzer};
use sinks::display::TerminalDisplay;
use sinks::lights::TerminalLights;

/// Six-string guitar tuner: listens, finds the pitch and tells you which way to turn the peg.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON file replacing the built-in tuning profiles
    #[arg(long)]
    profiles: Option<PathBuf>,

    /// Profile highlighted when the menu opens
    #[arg(short, long)]
    profile: Option<usize>,

    /// In-tune tolerance in Hz
    #[arg(short, long)]
    tolerance: Option<f32>,

    /// Use a synthetic tone at this frequency instead of the microphone
    #[arg(long, value_name = "HZ")]
    simulate: Option<f32>,

    /// Keep the buzzer quiet
    #[arg(long)]
    mute: bool,

    /// Skip the welcome screen
    #[arg(long)]
    skip_welcome: bool,

    /// Log every cycle
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let config = load_config(&args)?;
    let catalog = match &args.profiles {
        Some(path) => TuningCatalog::from_json(path)
            .with_context(|| format!("loading tuning profiles from {}", path.display()))?,
        None => TuningCatalog::builtin(),
    };
    info!(
        "{} Hz capture, {} samples, {:.4} Hz per bin, tolerance {} Hz",
        config.sample_rate,
        config.fft_size,
        config.resolution_hz(),
        config.tolerance_hz
    );

    let source: Box<dyn SampleSource> = match args.simulate {
        Some(freq) => {
            info!("Simulating a {:.2} Hz string", freq);
            Box::new(SineSource::new(freq, config.sample_rate, config.fft_size))
        }
        None => Box::new(
            CpalSampleSource::new(config.sample_rate, config.fft_size)
                .context("starting audio capture")?,
        ),
    };

    let buzzer: Box<dyn AudibleSink> = if args.mute {
        Box::new(SilentBuzzer)
    } else {
        match SquareWaveBuzzer::from_default_device() {
            Some(buzzer) => Box::new(buzzer),
            None => {
                warn!("No usable output device, buzzer muted");
                Box::new(SilentBuzzer)
            }
        }
    };

    let sinks = FeedbackSinks {
        display: Box::new(TerminalDisplay::new(io::stdout())),
        indicator: Box::new(TerminalLights::new(io::stdout())),
        buzzer,
    };

    let mut session = TuningSession::new(
        config,
        catalog,
        source,
        sinks,
        Box::new(KeyboardNavigation::spawn_stdin()),
    )
    .context("building tuning session")?;

    session.run()
}

/// Reads the configuration file, if any, and applies command line overrides.
fn load_config(args: &Args) -> Result<TunerConfig> {
    let mut config = match &args.config {
        Some(path) => TunerConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => TunerConfig::default(),
    };
    if let Some(tolerance) = args.tolerance {
        config.tolerance_hz = tolerance;
    }
    if let Some(profile) = args.profile {
        config.default_profile = profile;
    }
    if args.skip_welcome {
        config.welcome_ms = 0;
    }
    config.validate().context("checking configuration")?;
    Ok(config)
}
