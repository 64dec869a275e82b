//! The penalty decision engine: one telemetry sample in, a batch of notifications out.

pub mod cut_detector;
pub mod ledger;
pub mod notifier;
pub mod pit_monitor;
pub mod race_timer;
pub mod start_lights;
pub mod state;

use log::{error, info, warn};
use serde::Serialize;

use crate::{
    PenaltyError,
    chat::{self, LocalIdentity},
    config::{CalendarDay, PenaltyConfig, PenaltyMode},
    speed_store::SpeedStore,
    telemetry::{SessionInfo, SessionKind, TelemetrySample},
};

pub use cut_detector::CutEvent;
pub use ledger::PenaltyReason;
pub use notifier::{
    BlinkDirective, BlinkTarget, Flag, Lamp, LightsFrame, Notification, TextColour,
};
pub use pit_monitor::PitEvents;
pub use start_lights::{StartStage, light_hold_seconds};
pub use state::{CutState, EngineState};

use cut_detector::CutContext;
use ledger::Ledger;
use notifier::Notifier;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub(crate) const DRIVE_THROUGH_TEXT: &str = "DRIVE THROUGH PENALTY";
const CONFIG_ERROR_TEXT: &str = "Error reading config";
const UNSUPPORTED_SESSION_TEXT: &str = "No cuts in this mode";
/// Session clock jitter allowed before a rising time left counts as a race restart.
const RESTART_JITTER_S: f64 = 0.5;

/// Red/green cue for the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Indicator {
    /// Speeding in pit lane, or off track in a cut that will count
    Red,
    /// In pit lane within the limit, or off track in a cut that will not count
    Green,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct TickReport {
    pub cut_event: CutEvent,
    pub pit_events: PitEvents,
    pub notifications: Vec<Notification>,
}

pub struct PenaltyEngine {
    config: PenaltyConfig,
    session_info: SessionInfo,
    calendar: CalendarDay,
    /// Chat and penalties are enabled on this day and server
    enabled: bool,
    countup_timer: bool,
    disabled_reason: Option<String>,
    state: EngineState,
    notifier: Notifier,
}

impl PenaltyEngine {
    pub fn new(
        config: PenaltyConfig,
        session_info: SessionInfo,
        calendar: CalendarDay,
        max_observed_speed: f32,
    ) -> Self {
        let enabled = config.is_enabled(calendar, &session_info.server_name);
        let config = if enabled { config } else { config.restricted() };
        info!(
            "Penalty engine for {} in {} at {} ({}), best speed {:.1}",
            session_info.player_name,
            session_info.car_name,
            session_info.track_name,
            config.cfg_name,
            max_observed_speed
        );

        Self {
            countup_timer: config.is_race_countup_timer_enabled(calendar),
            notifier: Notifier::new(
                &session_info.player_name,
                enabled,
                config.use_flag_images,
                config.chat_duration_s,
            ),
            config,
            session_info,
            calendar,
            enabled,
            disabled_reason: None,
            state: EngineState::new(max_observed_speed),
        }
    }

    /// An engine that only reports that the configuration could not be read.
    pub fn disabled(error: &PenaltyError, session_info: SessionInfo) -> Self {
        error!("Penalty engine disabled: {}", error);
        let mut engine = Self::new(
            PenaltyConfig::default(),
            session_info,
            CalendarDay {
                weekday: 0,
                day_of_month: 1,
            },
            0.,
        );
        engine.disabled_reason = Some(error.to_string());
        engine
    }

    pub fn config(&self) -> &PenaltyConfig {
        &self.config
    }

    pub fn session_info(&self) -> &SessionInfo {
        &self.session_info
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && self.disabled_reason.is_none()
    }

    pub fn max_observed_speed(&self) -> f32 {
        self.state.max_observed_speed
    }

    pub fn indicator(&self) -> Option<Indicator> {
        if self.state.pit.speeding_in_pit_lane {
            return Some(Indicator::Red);
        }
        match self.state.cut.state {
            CutState::Cutting => Some(Indicator::Red),
            CutState::SafeCutting => Some(Indicator::Green),
            CutState::NotCutting if self.state.pit.was_in_pit_lane => Some(Indicator::Green),
            CutState::NotCutting => None,
        }
    }

    /// The app window was shown again. The version line is re-sent on the next tick.
    pub fn on_activated(&mut self) {
        self.state.version_sent = false;
    }

    pub fn on_dismissed(&mut self) -> Vec<Notification> {
        self.notifier.log("app dismissed");
        self.notifier.drain()
    }

    /// What to show for an incoming chat message, `None` to ignore it.
    pub fn display_chat(&self, message: &str, author: &str) -> Option<String> {
        chat::display_text(
            message,
            author,
            LocalIdentity {
                team: self.config.team,
                team_car: self.config.team_car,
            },
        )
    }

    pub fn persist_max_speed(&self, store: &mut impl SpeedStore) -> Result<(), PenaltyError> {
        store.save_max_speed(&self.session_info.max_speed_key(), self.state.max_observed_speed)
    }

    fn ledger(&mut self, session: SessionKind) -> Ledger<'_> {
        Ledger {
            config: &self.config,
            state: &mut self.state.ledger,
            notifier: &mut self.notifier,
            session,
            enabled: self.enabled,
        }
    }

    fn send_version(&mut self) {
        let line = format!(
            "running version {}{},{}",
            VERSION,
            self.config.cfg_name,
            self.config.summary()
        );
        self.notifier.log(&line);
        self.state.version_sent = true;
    }

    fn reset_session(&mut self, session: SessionKind) {
        self.ledger(session).reset_warnings();
        self.state.ledger.speeding_issued_on_lap = 0;
        self.state.session_enabled = self.config.is_session_enabled(session);
        self.state.last_lap = 0;
        self.state.cut = Default::default();

        let pit_box = self.state.pit.pit_box;
        self.state.pit = Default::default();
        self.state.pit.pit_box = pit_box;

        if self.state.race_timer.reset() {
            self.notifier.race_timer(None);
        }

        let lights_shown = self.state.start.stage > StartStage::Idle
            && self.state.start.stage < StartStage::Hidden;
        if self.config.use_start_lights && lights_shown {
            self.notifier.start_lights(LightsFrame::hidden());
        }
        if session == SessionKind::Race {
            self.state.start.race_start();
        }
    }

    fn detect_session_change(&mut self, sample: &TelemetrySample) {
        let session = sample.session;
        let time_left = sample.session_time_left_s;

        if self.state.last_session != Some(session) {
            info!("Session changed to {}", session);
            self.reset_session(session);
            self.state.last_session = Some(session);
        } else if session == SessionKind::Race
            && time_left.is_finite()
            && time_left > self.state.last_session_time_left + RESTART_JITTER_S
        {
            info!("Race restarted");
            self.reset_session(session);
        }

        if time_left.is_finite() {
            self.state.last_session_time_left = time_left;
        }
    }

    fn run_start_sequence(&mut self, sample: &TelemetrySample) {
        if !self.config.use_start_lights || sample.session != SessionKind::Race {
            return;
        }

        let hold_s = light_hold_seconds(
            self.session_info.track_name.chars().count(),
            self.session_info.number_of_laps,
            self.calendar.day_of_month,
        );
        if let Some(frame) = self
            .state
            .start
            .advance(sample.delta_s, sample.lap_time_ms, hold_s)
        {
            self.notifier.start_lights(frame);
        }

        if self
            .state
            .start
            .check_jump_start(sample.lap_time_ms, sample.speed_kmh, sample.lap)
        {
            warn!("Jump start on lap {}", sample.lap);
            self.notifier.set_warning("JUMP START", TextColour::Yellow);
            self.notifier
                .erase_warning_after(self.config.warning_duration_s);
            self.ledger(sample.session)
                .issue_penalty(PenaltyReason::JumpStart, sample.lap);
        }
    }

    fn check_speeding(&mut self, sample: &TelemetrySample) {
        let speeding = pit_monitor::is_speeding(sample, self.config.pit_lane_speed);
        self.state.pit.speeding_in_pit_lane = speeding;
        if !self.config.enable_speeding_penalties || !speeding {
            return;
        }

        // a pending speeding drive through covers every later pass until it is served
        let ledger = &self.state.ledger;
        let already_penalised =
            ledger.speeding_penalty_active || sample.lap == ledger.speeding_issued_on_lap;
        if sample.session == SessionKind::Race && !already_penalised {
            self.ledger(sample.session)
                .issue_penalty(PenaltyReason::Speeding, sample.lap);
            self.state.ledger.speeding_penalty_active =
                self.config.penalty_mode_speeding == PenaltyMode::DriveThrough;
            self.state.ledger.speeding_issued_on_lap = sample.lap;
        }
    }

    fn track_pit_stop(&mut self, sample: &TelemetrySample) -> PitEvents {
        pit_monitor::latch_pit_box(&mut self.state.pit, sample, false);
        let events = pit_monitor::track_pit_stop(&mut self.state.pit, sample);

        if let Some(lap) = events.pit_stop_started {
            if self.config.team > 0 {
                let body = format!(
                    "Car {} has pitted. GO!{}lap {}",
                    self.config.team_car,
                    chat::CHAT_DELIM,
                    lap
                );
                self.notifier.team(self.config.team, &body);
            } else {
                self.notifier.log(&format!("Pitted on lap {lap}"));
            }
        }
        if let Some(litres) = events.pit_stop_ended {
            self.notifier.log(&format!("Added {litres:.0} litres"));
        }
        events
    }

    fn finish(&mut self, report: TickReport) -> TickReport {
        self.notifier.poll(self.state.ledger.penalty_active);
        TickReport {
            notifications: self.notifier.drain(),
            ..report
        }
    }

    /// Advances the engine by one telemetry sample.
    pub fn tick(&mut self, sample: &TelemetrySample) -> TickReport {
        self.state.clock += sample.delta_s;
        self.notifier.set_clock(self.state.clock);

        if self.disabled_reason.is_some() {
            if !self.state.initialised {
                self.notifier.set_warning(CONFIG_ERROR_TEXT, TextColour::Red);
                self.state.initialised = true;
            }
            return TickReport {
                notifications: self.notifier.drain(),
                ..TickReport::default()
            };
        }

        if !self.state.initialised {
            pit_monitor::latch_pit_box(&mut self.state.pit, sample, true);
            self.state.initialised = true;
        }
        if !self.state.version_sent {
            self.send_version();
        }

        let session = sample.session;
        let lap = sample.lap;
        self.detect_session_change(sample);

        if sample.speed_kmh > self.state.max_observed_speed {
            self.state.max_observed_speed = sample.speed_kmh;
        }

        // cut detection runs first and sees the ledger as the previous tick left it
        let cut_event = if session.supports_cut_detection() {
            let counting = self.state.session_enabled
                && (session != SessionKind::Race || lap > self.config.amnesty_laps);
            cut_detector::detect(
                &self.config,
                &mut self.state.cut,
                sample,
                CutContext {
                    now: self.state.clock,
                    max_observed_speed: self.state.max_observed_speed,
                    penalty_active: self.state.ledger.penalty_active,
                    counting,
                },
            )
        } else {
            CutEvent::NoChange
        };

        if pit_monitor::track_pit_lane(&mut self.state.pit, sample) && self.config.team > 0 {
            let body = format!("Car {} has entered pit lane", self.config.team_car);
            self.notifier.team(self.config.team, &body);
        }
        let pit_events = if session.supports_cut_detection() {
            self.track_pit_stop(sample)
        } else {
            PitEvents::default()
        };
        self.check_speeding(sample);

        self.run_start_sequence(sample);
        if self.countup_timer {
            if let Some(seconds) = self.state.race_timer.update(
                session == SessionKind::Race,
                sample.lap_time_ms,
                sample.speed_kmh,
            ) {
                self.notifier.race_timer(seconds);
            }
        }

        if !session.supports_cut_detection() {
            self.notifier
                .set_warning(UNSUPPORTED_SESSION_TEXT, TextColour::Yellow);
            return self.finish(TickReport::default());
        }

        if lap != self.state.last_lap {
            self.ledger(session).on_lap_boundary(sample.is_in_pit_lane);
            self.state.last_lap = lap;
        }
        self.ledger(session)
            .check_qual_slow_down(sample.speed_kmh, sample.is_in_pit_lane);
        let entered_on_lap = self.state.pit.pit_lane_entered_on_lap;
        self.ledger(session).process_pit_lane(
            sample.is_in_pit_lane,
            sample.speed_kmh,
            lap,
            entered_on_lap,
        );

        if cut_event == CutEvent::CutEndedPenalizable {
            info!("Cut counted on lap {}", lap);
            self.ledger(session).on_cut_counted(lap);
        }

        self.finish(TickReport {
            cut_event,
            pit_events,
            notifications: Vec::new(),
        })
    }
}
