use serde::Serialize;

use crate::telemetry::SessionKind;

use super::{race_timer::RaceTimer, start_lights::StartSequence};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum CutState {
    #[default]
    NotCutting,
    /// Off track, and the cut may still be counted when the car rejoins
    Cutting,
    /// Off track, but this excursion can no longer be counted
    SafeCutting,
}

/// Bookkeeping of the current off-track excursion. Only the cut detector writes it.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CutTracking {
    pub state: CutState,
    pub start_time: f64,
    pub start_speed: f32,
    pub slowest_speed: f32,
    /// Session clock of the last counted cut
    pub last_counted_at: Option<f64>,
    /// Dirt levels from the previous tick
    pub last_dirt: [f32; 4],
}

/// Warnings and penalties owed by the driver.
#[derive(Clone, Debug, Default, Serialize)]
pub struct LedgerState {
    pub warning_count: u32,
    /// A drive through penalty is pending
    pub penalty_active: bool,
    pub penalty_laps_remaining: u32,
    /// The car stopped in pit lane, the current pass does not count as a drive through
    pub penalty_voided: bool,
    pub taking_penalty: bool,
    pub penalty_message_sent: bool,
    pub speeding_penalty_active: bool,
    pub speeding_issued_on_lap: u32,
    /// A cut invalidated the current qualifying lap
    pub invalid_qual_lap: bool,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct PitState {
    pub was_in_pit_lane: bool,
    pub pit_lane_entered_on_lap: u32,
    pub last_pit_lane_entered_on_lap: u32,
    pub was_in_pit_stop: bool,
    pub pit_stop_start_fuel: f32,
    pub pit_box: Option<[f32; 3]>,
    pub speeding_in_pit_lane: bool,
}

/// Everything the engine remembers between ticks.
///
/// Counters are reset on session change and race restart; the session clock and the max
/// observed speed survive both.
#[derive(Clone, Debug, Serialize)]
pub struct EngineState {
    /// Session clock in seconds, advanced by each tick's delta
    pub clock: f64,
    pub initialised: bool,
    pub version_sent: bool,
    pub cut: CutTracking,
    pub ledger: LedgerState,
    pub pit: PitState,
    pub start: StartSequence,
    pub race_timer: RaceTimer,
    pub last_session: Option<SessionKind>,
    pub last_session_time_left: f64,
    pub last_lap: u32,
    /// Cuts are counted in the current session
    pub session_enabled: bool,
    pub max_observed_speed: f32,
}

impl EngineState {
    pub fn new(max_observed_speed: f32) -> Self {
        Self {
            clock: 0.,
            initialised: false,
            version_sent: false,
            cut: CutTracking::default(),
            ledger: LedgerState::default(),
            pit: PitState::default(),
            start: StartSequence::default(),
            race_timer: RaceTimer::default(),
            last_session: None,
            last_session_time_left: f64::INFINITY,
            last_lap: 0,
            session_enabled: true,
            max_observed_speed,
        }
    }
}
