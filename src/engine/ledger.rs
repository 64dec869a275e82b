use std::fmt::Display;

use log::{info, warn};
use serde::Serialize;

use crate::{
    config::{PenaltyConfig, PenaltyMode},
    telemetry::SessionKind,
};

use super::{
    DRIVE_THROUGH_TEXT,
    notifier::{Flag, Notifier, TextColour},
    state::LedgerState,
};

/// Seconds a time penalty text keeps blinking.
const TIME_PENALTY_BLINK_S: f64 = 30.;
/// Blink "forever": until the penalty is served or the lap ends.
const PERSISTENT_BLINK_S: f64 = 10000.;
/// Seconds the warning count blinks on the final warning.
const FINAL_WARNING_BLINK_S: f64 = 30.;
/// Moving slower than this in pit lane means the car stopped.
const STOPPED_SPEED: f32 = 0.3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PenaltyReason {
    Cutting,
    Speeding,
    JumpStart,
}

impl Display for PenaltyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PenaltyReason::Cutting => write!(f, "CUTTING"),
            PenaltyReason::Speeding => write!(f, "SPEEDING"),
            PenaltyReason::JumpStart => write!(f, "JUMP START"),
        }
    }
}

/// Warning and penalty bookkeeping for one tick.
pub(crate) struct Ledger<'a> {
    pub config: &'a PenaltyConfig,
    pub state: &'a mut LedgerState,
    pub notifier: &'a mut Notifier,
    pub session: SessionKind,
    /// Penalties are issued on this day and server
    pub enabled: bool,
}

impl Ledger<'_> {
    /// Status line text. Only races have one.
    pub fn status_text(&self) -> Option<String> {
        if self.session != SessionKind::Race {
            return None;
        }
        let text = if !self.config.enable_penalties {
            format!("Warnings: {}", self.state.warning_count)
        } else if self.state.penalty_active {
            match self.state.penalty_laps_remaining {
                0 => "THIS LAP".to_string(),
                1 => "1 lap left".to_string(),
                laps => format!("{laps} laps left"),
            }
        } else {
            format!(
                "Warnings: {}/{}",
                self.state.warning_count, self.config.total_warnings
            )
        };
        Some(text)
    }

    pub fn refresh_status(&mut self) {
        let text = self.status_text();
        self.notifier.set_status(text);
    }

    fn mode_for(&self, reason: PenaltyReason) -> PenaltyMode {
        match reason {
            PenaltyReason::Cutting => self.config.penalty_mode_cutting,
            PenaltyReason::Speeding => self.config.penalty_mode_speeding,
            PenaltyReason::JumpStart => PenaltyMode::Time,
        }
    }

    fn seconds_for(&self, reason: PenaltyReason) -> u32 {
        match reason {
            PenaltyReason::Cutting => self.config.seconds_per_cutting_penalty,
            PenaltyReason::Speeding => self.config.seconds_per_speeding_penalty,
            PenaltyReason::JumpStart => self.config.jump_start_penalty_seconds,
        }
    }

    pub fn issue_penalty(&mut self, reason: PenaltyReason, lap: u32) {
        let blink_for = match self.mode_for(reason) {
            PenaltyMode::DriveThrough => {
                info!("Drive through penalty for {} on lap {}", reason, lap);
                self.notifier.set_warning(DRIVE_THROUGH_TEXT, TextColour::Red);
                self.notifier.show_flag(Flag::Black);
                self.notifier
                    .broadcast(&format!("DRIVE THROUGH PENALTY FOR {reason}|on lap {lap}"));
                self.state.penalty_active = true;
                self.state.penalty_laps_remaining = self.config.laps_to_take_penalty;
                PERSISTENT_BLINK_S
            }
            PenaltyMode::Time => {
                let seconds = self.seconds_for(reason);
                info!("{} second penalty for {} on lap {}", seconds, reason, lap);
                self.notifier
                    .set_warning(&format!("{seconds} SECOND PENALTY"), TextColour::Red);
                self.notifier.broadcast(&format!(
                    "GIVEN A {seconds} SECOND TIME PENALTY FOR {reason}|on lap {lap}"
                ));
                if reason == PenaltyReason::Cutting {
                    self.state.warning_count = 0;
                }
                TIME_PENALTY_BLINK_S
            }
        };
        self.notifier.cancel_warning_erase();
        self.notifier.stop_status_blink();
        self.refresh_status();
        self.notifier.start_warning_blink(blink_for);
    }

    /// A cut that counts: one more warning, and maybe a penalty. Qualifying cuts count
    /// as warnings too, on top of invalidating the lap.
    pub fn on_cut_counted(&mut self, lap: u32) {
        self.state.warning_count += 1;
        self.notifier.stop_status_blink();
        self.refresh_status();

        let over_limit = self.state.warning_count > self.config.total_warnings;
        if self.config.enable_penalties && self.session == SessionKind::Race && over_limit {
            if self.enabled {
                self.issue_penalty(PenaltyReason::Cutting, lap);
            }
        } else if self.session == SessionKind::Qualify {
            if self.enabled {
                self.state.invalid_qual_lap = true;
                self.notifier
                    .set_warning("INVALID LAP, SLOW DOWN", TextColour::Yellow);
                self.notifier.log("Cut the track on qual lap");
                self.notifier.start_warning_blink(PERSISTENT_BLINK_S);
            }
        } else {
            self.notifier.set_warning("CUT TRACK WARNING", TextColour::Yellow);
            self.notifier
                .erase_warning_after(self.config.warning_duration_s);
            self.notifier.show_flag(Flag::BlackWhite);
            self.notifier.log(&format!("Cut the track on lap {lap}"));
            if self.state.warning_count == self.config.total_warnings {
                self.notifier.start_status_blink(Some(FINAL_WARNING_BLINK_S));
            }
        }
    }

    /// A new lap started. Counts down the laps left to serve a drive through, except
    /// when crossing the line in pit lane right after a speeding penalty, so one pass
    /// down pit lane is not counted twice.
    pub fn on_lap_boundary(&mut self, in_pit_lane: bool) {
        let counts_down = !self.state.speeding_penalty_active || !in_pit_lane;
        if self.config.has_drive_through_mode()
            && counts_down
            && self.state.penalty_active
            && !self.state.taking_penalty
        {
            if self.state.penalty_laps_remaining == 0 {
                warn!("Drive through penalty ignored");
                self.notifier.broadcast("ignored penalty");
                self.reset_warnings();
            } else {
                self.state.penalty_laps_remaining -= 1;
                if self.state.penalty_laps_remaining == 0 {
                    self.notifier.start_status_blink(None);
                }
            }
            self.refresh_status();
        }

        if self.state.invalid_qual_lap {
            self.state.invalid_qual_lap = false;
            self.notifier.stop_warning_blink_soon();
        }
    }

    /// Ends the invalid lap warning once the driver has slowed down or entered pit lane.
    pub fn check_qual_slow_down(&mut self, speed_kmh: f32, in_pit_lane: bool) {
        if self.state.invalid_qual_lap
            && (speed_kmh <= self.config.qual_slow_down_speed || in_pit_lane)
        {
            self.state.invalid_qual_lap = false;
            self.notifier.stop_warning_blink_soon();
        }
    }

    fn can_take_drive_through(&self, pit_lane_entered_on_lap: u32) -> bool {
        self.state.penalty_active
            && !self.state.penalty_voided
            && (!self.state.speeding_penalty_active
                || pit_lane_entered_on_lap > self.state.speeding_issued_on_lap)
    }

    /// Serves drive through penalties. A speeding penalty can only be served on a later
    /// pit lane visit than the one it was given on. Stopping voids the current pass.
    pub fn process_pit_lane(
        &mut self,
        in_pit_lane: bool,
        speed_kmh: f32,
        lap: u32,
        pit_lane_entered_on_lap: u32,
    ) {
        if !self.config.has_drive_through_mode() {
            return;
        }

        if in_pit_lane {
            if !self.can_take_drive_through(pit_lane_entered_on_lap) {
                return;
            }
            self.notifier.cancel_warning_erase();
            if speed_kmh > STOPPED_SPEED {
                self.notifier
                    .set_warning("Penalty being taken", TextColour::Yellow);
                if !self.state.penalty_message_sent {
                    self.notifier.broadcast("taking penalty");
                    self.state.penalty_message_sent = true;
                }
                self.state.taking_penalty = true;
            } else {
                self.notifier.set_warning(DRIVE_THROUGH_TEXT, TextColour::Red);
                info!("Stopped in pit lane, drive through must be taken again");
                self.notifier.broadcast("re-take penalty");
                self.state.taking_penalty = false;
                self.state.penalty_voided = true;
            }
        } else if self.state.taking_penalty {
            info!("Drive through penalty taken on lap {}", lap);
            self.reset_warnings();
            self.notifier.broadcast(&format!("taken penalty|on lap {lap}"));
            self.notifier.stop_warning_blink();
        } else {
            self.state.penalty_voided = false;
            self.state.penalty_message_sent = false;
        }
    }

    /// Clears warnings and penalties, after a penalty is served or ignored and on
    /// session change.
    pub fn reset_warnings(&mut self) {
        *self.state = LedgerState {
            speeding_issued_on_lap: self.state.speeding_issued_on_lap,
            ..LedgerState::default()
        };
        self.notifier.clear_warning();
        self.notifier.stop_status_blink();
        self.notifier.stop_warning_blink();
        self.notifier.hide_flag(Flag::Black);
        self.notifier.hide_flag(Flag::BlackWhite);
        self.refresh_status();
    }
}
