//! # Tuning Session Module
//!
//! The session owns the tuning state and drives the
//! capture → estimate → evaluate → notify cycle.
//!
//! ## Architecture
//! - **SELECT_PROFILE**: the menu is shown; "advance" moves the highlight,
//!   "confirm" locks the profile in
//! - **MONITORING**: one cycle per poll interval, forever; "advance" moves to
//!   the next string
//! - **Collaborators**: display, indicator lights, buzzer and navigation are
//!   traits, so the session runs the same against hardware, a terminal or mocks
//!
//! Cycles never overlap: every sink call of cycle k returns before the capture
//! of cycle k+1 starts.

use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

#[cfg(test)]
use mockall::automock;

use crate::audio::SampleSource;
use crate::config::TunerConfig;
use crate::error::{Result, TunerError};
use crate::fft::SpectralEstimator;
use crate::tuning::{self, Note, STRING_COUNT, TuningCatalog, TuningProfile, TuningStatus, Verdict};

/// Renders session output for the player.
#[cfg_attr(test, automock)]
pub trait DisplaySink {
    fn show_welcome(&mut self);
    /// Lists the profiles with `highlighted` marked.
    fn show_menu(&mut self, profiles: &[TuningProfile], highlighted: usize);
    /// Shown while a capture is in progress.
    fn show_listening(&mut self, note: Note);
    fn show_reading(&mut self, note: Note, verdict: &Verdict);
}

/// Three independent lights; exactly one is lit per verdict.
#[cfg_attr(test, automock)]
pub trait IndicatorSink {
    fn indicate(&mut self, status: TuningStatus);
}

/// Plays a tone. Blocks for `duration`.
#[cfg_attr(test, automock)]
pub trait AudibleSink {
    fn play_tone(&mut self, frequency_hz: f32, duration: Duration);
}

/// Debounced button presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEvent {
    /// Next string while monitoring; next profile in the menu.
    AdvanceString,
    /// Leaves the profile menu.
    ConfirmSelection,
}

#[cfg_attr(test, automock)]
pub trait NavigationInput {
    /// Next pending press, if any. Never blocks.
    fn poll(&mut self) -> Option<NavEvent>;
}

/// The lit/unlit state of the three indicator lights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndicatorLights {
    pub loose: bool,
    pub ok: bool,
    pub tight: bool,
}

impl IndicatorLights {
    pub fn for_status(status: TuningStatus) -> Self {
        match status {
            TuningStatus::TooLow => Self { loose: true, ok: false, tight: false },
            TuningStatus::InTune => Self { loose: false, ok: true, tight: false },
            TuningStatus::TooHigh => Self { loose: false, ok: false, tight: true },
        }
    }
}

/// Selected profile, selected string and tolerance.
///
/// Indices only change through wrapping increments, so they are always in range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuningState {
    profile_index: usize,
    string_index: usize,
    tolerance_hz: f32,
}

impl TuningState {
    /// Power-on state. `profile_index` must be below `profile_count`.
    pub fn new(profile_index: usize, profile_count: usize, tolerance_hz: f32) -> Result<Self> {
        if profile_index >= profile_count {
            return Err(TunerError::Config(format!(
                "default profile {} is outside the catalog of {} profile(s)",
                profile_index, profile_count
            )));
        }
        Ok(Self { profile_index, string_index: 0, tolerance_hz })
    }

    pub fn profile_index(&self) -> usize {
        self.profile_index
    }

    pub fn string_index(&self) -> usize {
        self.string_index
    }

    pub fn tolerance_hz(&self) -> f32 {
        self.tolerance_hz
    }

    /// Moves to the next string, wrapping after the sixth.
    pub fn advance_string(&mut self) {
        self.string_index = (self.string_index + 1) % STRING_COUNT;
    }

    /// Moves the profile highlight forward, wrapping at `profile_count`.
    pub fn advance_profile(&mut self, profile_count: usize) {
        self.profile_index = (self.profile_index + 1) % profile_count;
    }
}

/// Which screen the session is on. There is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    SelectProfile,
    Monitoring,
}

/// Result of one monitoring cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    Completed(Verdict),
    /// The estimate failed; nothing was evaluated or shown.
    Dropped,
}

/// Display, lights and buzzer, bundled.
pub struct FeedbackSinks {
    pub display: Box<dyn DisplaySink>,
    pub indicator: Box<dyn IndicatorSink>,
    pub buzzer: Box<dyn AudibleSink>,
}

/// The tuner's single thread of control.
pub struct TuningSession {
    config: TunerConfig,
    catalog: TuningCatalog,
    state: TuningState,
    session_state: SessionState,
    last_announced: Option<usize>,
    source: Box<dyn SampleSource>,
    estimator: SpectralEstimator,
    sinks: FeedbackSinks,
    navigation: Box<dyn NavigationInput>,
}

impl TuningSession {
    /// Builds a session in SELECT_PROFILE with the configured default profile highlighted.
    ///
    /// # Returns
    /// * `Err(e)` - Invalid configuration or a default profile outside the catalog
    pub fn new(
        config: TunerConfig,
        catalog: TuningCatalog,
        source: Box<dyn SampleSource>,
        sinks: FeedbackSinks,
        navigation: Box<dyn NavigationInput>,
    ) -> Result<Self> {
        config.validate()?;
        let state = TuningState::new(config.default_profile, catalog.len(), config.tolerance_hz)?;
        let estimator = SpectralEstimator::new(config.sample_rate, config.fft_size);
        Ok(Self {
            config,
            catalog,
            state,
            session_state: SessionState::SelectProfile,
            last_announced: None,
            source,
            estimator,
            sinks,
            navigation,
        })
    }

    pub fn state(&self) -> &TuningState {
        &self.state
    }

    pub fn session_state(&self) -> SessionState {
        self.session_state
    }

    pub fn profile(&self) -> &TuningProfile {
        self.catalog.profile(self.state.profile_index)
    }

    /// Target note of the currently selected string.
    pub fn target(&self) -> Note {
        self.profile().note(self.state.string_index)
    }

    /// Runs the tuner until the process is stopped.
    pub fn run(&mut self) -> ! {
        info!("Starting tuner session");
        self.sinks.display.show_welcome();
        thread::sleep(self.config.welcome());

        while self.session_state == SessionState::SelectProfile {
            self.step_menu();
            thread::sleep(self.config.menu_poll());
        }

        info!("Entering monitoring loop");
        loop {
            self.run_cycle();
            thread::sleep(self.config.poll_interval());
        }
    }

    /// Handles pending navigation and redraws the menu.
    ///
    /// Returns `true` once the selection has been confirmed.
    pub fn step_menu(&mut self) -> bool {
        if self.session_state == SessionState::Monitoring {
            return true;
        }

        while let Some(event) = self.navigation.poll() {
            match event {
                NavEvent::AdvanceString => {
                    self.state.advance_profile(self.catalog.len());
                    debug!("Menu highlight moved to profile {}", self.state.profile_index);
                }
                NavEvent::ConfirmSelection => {
                    info!("Selected tuning: {}", self.profile().name);
                    self.session_state = SessionState::Monitoring;
                    return true;
                }
            }
        }

        self.sinks
            .display
            .show_menu(self.catalog.profiles(), self.state.profile_index);
        false
    }

    /// Runs one capture → estimate → evaluate → notify cycle.
    ///
    /// Does nothing but apply navigation if the profile is not yet confirmed;
    /// call [`step_menu`](Self::step_menu) until it returns `true` first.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        if self.session_state == SessionState::SelectProfile {
            self.step_menu();
            return CycleOutcome::Dropped;
        }

        self.apply_navigation();
        let note = self.target();
        self.sinks.display.show_listening(note);

        let buffer = self.source.capture();
        let estimate = self.estimator.estimate(&buffer);
        self.source.recycle(buffer);

        let detected = match estimate {
            Ok(freq) => freq,
            Err(e) => {
                warn!("Dropping cycle: {}", e);
                return CycleOutcome::Dropped;
            }
        };

        let verdict = tuning::evaluate(detected, note.frequency, self.state.tolerance_hz);
        debug!(
            "Check tuning: detected {:.2} Hz, target {:.2} Hz -> {:?}",
            verdict.detected_hz, verdict.target_hz, verdict.status
        );

        self.sinks.indicator.indicate(verdict.status);
        if verdict.status == TuningStatus::InTune {
            self.sinks.buzzer.play_tone(note.frequency, self.config.tone_duration());
        }
        self.sinks.display.show_reading(note, &verdict);

        if self.last_announced != Some(self.state.string_index) {
            self.sinks.buzzer.play_tone(note.frequency, self.config.tone_duration());
            self.last_announced = Some(self.state.string_index);
        }

        CycleOutcome::Completed(verdict)
    }

    fn apply_navigation(&mut self) {
        while let Some(event) = self.navigation.poll() {
            match event {
                NavEvent::AdvanceString => {
                    self.state.advance_string();
                    info!("String changed to index: {}", self.state.string_index);
                }
                // Only meaningful in the menu.
                NavEvent::ConfirmSelection => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{MockSampleSource, SampleBuffer, SineSource};
    use mockall::predicate::eq;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    fn fast_config() -> TunerConfig {
        TunerConfig {
            poll_interval_ms: 0,
            menu_poll_ms: 0,
            welcome_ms: 0,
            tone_duration_ms: 0,
            ..TunerConfig::default()
        }
    }

    /// Navigation fed from a shared queue the test can push into.
    struct ScriptedNavigation(Rc<RefCell<VecDeque<NavEvent>>>);

    impl NavigationInput for ScriptedNavigation {
        fn poll(&mut self) -> Option<NavEvent> {
            self.0.borrow_mut().pop_front()
        }
    }

    fn quiet_sinks() -> FeedbackSinks {
        let mut display = MockDisplaySink::new();
        display.expect_show_welcome().return_const(());
        display.expect_show_menu().return_const(());
        display.expect_show_listening().return_const(());
        display.expect_show_reading().return_const(());
        let mut indicator = MockIndicatorSink::new();
        indicator.expect_indicate().return_const(());
        let mut buzzer = MockAudibleSink::new();
        buzzer.expect_play_tone().return_const(());
        FeedbackSinks {
            display: Box::new(display),
            indicator: Box::new(indicator),
            buzzer: Box::new(buzzer),
        }
    }

    fn session_with(
        source: Box<dyn SampleSource>,
        sinks: FeedbackSinks,
    ) -> (TuningSession, Rc<RefCell<VecDeque<NavEvent>>>) {
        let queue = Rc::new(RefCell::new(VecDeque::new()));
        let session = TuningSession::new(
            fast_config(),
            TuningCatalog::builtin(),
            source,
            sinks,
            Box::new(ScriptedNavigation(queue.clone())),
        )
        .unwrap();
        (session, queue)
    }

    fn confirm(session: &mut TuningSession, queue: &Rc<RefCell<VecDeque<NavEvent>>>) {
        queue.borrow_mut().push_back(NavEvent::ConfirmSelection);
        assert!(session.step_menu());
    }

    #[test]
    fn string_index_wraps_after_six_advances() {
        let mut state = TuningState::new(0, 3, 8.0).unwrap();
        for i in 0..STRING_COUNT {
            assert_eq!(state.string_index(), i);
            state.advance_string();
        }
        assert_eq!(state.string_index(), 0);
    }

    #[test]
    fn profile_index_stays_in_range() {
        let mut state = TuningState::new(2, 3, 8.0).unwrap();
        for _ in 0..1000 {
            state.advance_profile(3);
            assert!(state.profile_index() < 3);
        }
        assert_eq!(state.profile_index(), (2 + 1000) % 3);
    }

    #[test]
    fn default_profile_outside_catalog_is_rejected() {
        assert!(TuningState::new(3, 3, 8.0).is_err());
        let config = TunerConfig { default_profile: 7, ..fast_config() };
        let result = TuningSession::new(
            config,
            TuningCatalog::builtin(),
            Box::new(SineSource::new(82.41, 8000, 1024)),
            quiet_sinks(),
            Box::new(ScriptedNavigation(Rc::new(RefCell::new(VecDeque::new())))),
        );
        assert!(result.is_err());
    }

    #[test]
    fn indicator_lights_exactly_one() {
        for status in [TuningStatus::TooLow, TuningStatus::InTune, TuningStatus::TooHigh] {
            let lights = IndicatorLights::for_status(status);
            let lit = [lights.loose, lights.ok, lights.tight].iter().filter(|&&on| on).count();
            assert_eq!(lit, 1);
        }
        assert!(IndicatorLights::for_status(TuningStatus::TooHigh).tight);
        assert!(IndicatorLights::for_status(TuningStatus::TooLow).loose);
    }

    #[test]
    fn menu_navigation_cycles_profiles_then_confirms() {
        let (mut session, queue) = session_with(Box::new(SineSource::new(82.41, 8000, 1024)), quiet_sinks());
        assert_eq!(session.session_state(), SessionState::SelectProfile);

        queue.borrow_mut().extend([NavEvent::AdvanceString; 4]);
        assert!(!session.step_menu());
        assert_eq!(session.state().profile_index(), 1);
        assert_eq!(session.profile().name, "Drop D");

        confirm(&mut session, &queue);
        assert_eq!(session.session_state(), SessionState::Monitoring);
        assert_eq!(session.target(), Note { label: 'D', frequency: 73.42 });
    }

    #[test]
    fn menu_shows_highlighted_profile() {
        let mut display = MockDisplaySink::new();
        display
            .expect_show_menu()
            .withf(|profiles, highlighted| profiles.len() == 3 && *highlighted == 2)
            .times(1)
            .return_const(());
        let sinks = FeedbackSinks {
            display: Box::new(display),
            indicator: Box::new(MockIndicatorSink::new()),
            buzzer: Box::new(MockAudibleSink::new()),
        };
        let (mut session, queue) = session_with(Box::new(SineSource::new(82.41, 8000, 1024)), sinks);
        queue.borrow_mut().extend([NavEvent::AdvanceString, NavEvent::AdvanceString]);
        assert!(!session.step_menu());
    }

    #[test]
    fn cycle_before_confirmation_does_not_capture() {
        let mut source = MockSampleSource::new();
        source.expect_capture().never();
        let (mut session, _queue) = session_with(Box::new(source), quiet_sinks());
        assert_eq!(session.run_cycle(), CycleOutcome::Dropped);
    }

    #[test]
    fn in_tune_cycle_lights_ok_and_plays_target() {
        let mut indicator = MockIndicatorSink::new();
        indicator
            .expect_indicate()
            .with(eq(TuningStatus::InTune))
            .times(1)
            .return_const(());
        let mut buzzer = MockAudibleSink::new();
        // Once for the in-tune confirmation, once to announce the first string.
        buzzer
            .expect_play_tone()
            .withf(|freq, _| *freq == 82.41)
            .times(2)
            .return_const(());
        let mut display = MockDisplaySink::new();
        display.expect_show_menu().return_const(());
        display.expect_show_listening().times(1).return_const(());
        display
            .expect_show_reading()
            .withf(|note, verdict| note.label == 'E' && verdict.status == TuningStatus::InTune)
            .times(1)
            .return_const(());
        let sinks = FeedbackSinks {
            display: Box::new(display),
            indicator: Box::new(indicator),
            buzzer: Box::new(buzzer),
        };

        let (mut session, queue) = session_with(Box::new(SineSource::new(82.41, 8000, 1024)), sinks);
        confirm(&mut session, &queue);
        match session.run_cycle() {
            CycleOutcome::Completed(verdict) => {
                assert_eq!(verdict.status, TuningStatus::InTune);
                assert_eq!(verdict.target_hz, 82.41);
            }
            CycleOutcome::Dropped => panic!("cycle dropped"),
        }
    }

    #[test]
    fn sharp_string_lights_tight_without_confirmation_tone() {
        let mut indicator = MockIndicatorSink::new();
        indicator
            .expect_indicate()
            .with(eq(TuningStatus::TooHigh))
            .times(2)
            .return_const(());
        let mut buzzer = MockAudibleSink::new();
        // Only the first-string announcement; the second cycle is silent.
        buzzer.expect_play_tone().times(1).return_const(());
        let mut display = MockDisplaySink::new();
        display.expect_show_menu().return_const(());
        display.expect_show_listening().return_const(());
        display.expect_show_reading().return_const(());
        let sinks = FeedbackSinks {
            display: Box::new(display),
            indicator: Box::new(indicator),
            buzzer: Box::new(buzzer),
        };

        let (mut session, queue) = session_with(Box::new(SineSource::new(125.0, 8000, 1024)), sinks);
        confirm(&mut session, &queue);
        session.run_cycle();
        session.run_cycle();
    }

    #[test]
    fn advancing_string_announces_new_target() {
        let tones = Rc::new(RefCell::new(Vec::new()));
        struct RecordingBuzzer(Rc<RefCell<Vec<f32>>>);
        impl AudibleSink for RecordingBuzzer {
            fn play_tone(&mut self, frequency_hz: f32, _duration: Duration) {
                self.0.borrow_mut().push(frequency_hz);
            }
        }
        let mut sinks = quiet_sinks();
        sinks.buzzer = Box::new(RecordingBuzzer(tones.clone()));

        // Silence keeps every verdict TOO_LOW, so only announcements sound.
        let (mut session, queue) = session_with(Box::new(SineSource::with_shape(0.0, 0.0, 128.0, 8000, 1024)), sinks);
        confirm(&mut session, &queue);
        session.run_cycle();
        session.run_cycle();
        queue.borrow_mut().push_back(NavEvent::AdvanceString);
        session.run_cycle();

        assert_eq!(session.state().string_index(), 1);
        assert_eq!(*tones.borrow(), vec![82.41, 110.0]);
    }

    #[test]
    fn failed_estimate_drops_cycle_silently() {
        let mut source = MockSampleSource::new();
        source.expect_capture().times(1).returning(|| SampleBuffer::silent(10));
        source.expect_recycle().times(1).return_const(());
        let mut display = MockDisplaySink::new();
        display.expect_show_menu().return_const(());
        display.expect_show_listening().times(1).return_const(());
        display.expect_show_reading().never();
        let mut indicator = MockIndicatorSink::new();
        indicator.expect_indicate().never();
        let mut buzzer = MockAudibleSink::new();
        buzzer.expect_play_tone().never();
        let sinks = FeedbackSinks {
            display: Box::new(display),
            indicator: Box::new(indicator),
            buzzer: Box::new(buzzer),
        };

        let (mut session, queue) = session_with(Box::new(source), sinks);
        confirm(&mut session, &queue);
        assert_eq!(session.run_cycle(), CycleOutcome::Dropped);
    }

    /// Sinks and source that append to one shared call log.
    #[derive(Clone, Default)]
    struct CallLog(Rc<RefCell<Vec<&'static str>>>);

    impl CallLog {
        fn push(&self, call: &'static str) {
            self.0.borrow_mut().push(call);
        }
    }

    impl SampleSource for CallLog {
        fn capture(&mut self) -> SampleBuffer {
            self.push("capture");
            SampleBuffer::silent(1024)
        }

        fn recycle(&mut self, _buffer: SampleBuffer) {
            self.push("recycle");
        }
    }

    impl DisplaySink for CallLog {
        fn show_welcome(&mut self) {
            self.push("welcome");
        }
        fn show_menu(&mut self, _profiles: &[TuningProfile], _highlighted: usize) {
            self.push("menu");
        }
        fn show_listening(&mut self, _note: Note) {
            self.push("listening");
        }
        fn show_reading(&mut self, _note: Note, _verdict: &Verdict) {
            self.push("reading");
        }
    }

    impl IndicatorSink for CallLog {
        fn indicate(&mut self, _status: TuningStatus) {
            self.push("indicate");
        }
    }

    impl AudibleSink for CallLog {
        fn play_tone(&mut self, _frequency_hz: f32, _duration: Duration) {
            self.push("tone");
        }
    }

    #[test]
    fn cycles_are_strictly_sequential() {
        let log = CallLog::default();
        let sinks = FeedbackSinks {
            display: Box::new(log.clone()),
            indicator: Box::new(log.clone()),
            buzzer: Box::new(log.clone()),
        };
        let (mut session, queue) = session_with(Box::new(log.clone()), sinks);
        confirm(&mut session, &queue);
        session.run_cycle();
        session.run_cycle();

        let calls = log.0.borrow();
        assert_eq!(
            *calls,
            vec![
                "listening", "capture", "recycle", "indicate", "reading", "tone",
                "listening", "capture", "recycle", "indicate", "reading",
            ]
        );
        // Every notification of a cycle precedes the next capture.
        let second_capture = calls.iter().rposition(|&c| c == "capture").unwrap();
        let first_reading = calls.iter().position(|&c| c == "reading").unwrap();
        assert!(first_reading < second_capture);
    }
}
