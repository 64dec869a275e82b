use serde::Serialize;

use crate::{config::PenaltyConfig, telemetry::TelemetrySample};

use super::state::{CutState, CutTracking};

/// Outcome of one tick of cut detection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum CutEvent {
    #[default]
    NoChange,
    CutStarted,
    CutContinuing,
    /// The car rejoined and the cut counts
    CutEndedPenalizable,
    /// The car rejoined but the cut does not count
    CutEndedSafe,
}

/// Per tick inputs owned by other components.
#[derive(Clone, Copy, Debug)]
pub(crate) struct CutContext {
    pub now: f64,
    pub max_observed_speed: f32,
    /// A drive through is pending, new cuts are not tracked
    pub penalty_active: bool,
    /// Cuts count in this session and lap
    pub counting: bool,
}

/// Number of wheels off track, taking the larger of the reported count and the number
/// of wheels getting dirtier. Pit lane surfaces can dirty tyres, so nothing is off track
/// there.
pub(crate) fn effective_tyres_out(tracking: &mut CutTracking, sample: &TelemetrySample) -> u8 {
    let dirty_tyres_out = sample
        .dirt_levels
        .iter()
        .zip(tracking.last_dirt.iter())
        .filter(|(dirt, last)| **dirt > 0. && **dirt >= **last)
        .count() as u8;
    tracking.last_dirt = sample.dirt_levels;

    if sample.is_in_pit_lane {
        0
    } else {
        sample.tyres_out.max(dirty_tyres_out)
    }
}

/// Whether the excursion so far is still one that counts as a cut: short (or fast
/// compared to the best speed seen), and the car never slowed down much.
pub(crate) fn is_countable(
    config: &PenaltyConfig,
    tracking: &CutTracking,
    now: f64,
    speed: f32,
    max_observed_speed: f32,
) -> bool {
    let quick = now - tracking.start_time <= config.max_cut_time_s
        || speed > max_observed_speed * config.max_speed_ratio_for_cut;
    quick
        && speed / tracking.start_speed > config.min_slow_down_ratio
        && tracking.slowest_speed / tracking.start_speed > config.min_slow_down_ratio
}

pub(crate) fn detect(
    config: &PenaltyConfig,
    tracking: &mut CutTracking,
    sample: &TelemetrySample,
    ctx: CutContext,
) -> CutEvent {
    let tyres_out = effective_tyres_out(tracking, sample);
    let speed = sample.speed_kmh;

    if !ctx.penalty_active && tyres_out > config.wheels_out {
        return match tracking.state {
            CutState::NotCutting => {
                let debounced = tracking
                    .last_counted_at
                    .is_none_or(|at| ctx.now > at + config.seconds_between_cuts);
                if speed > config.min_speed && debounced {
                    tracking.state = CutState::Cutting;
                    tracking.start_time = ctx.now;
                    tracking.start_speed = speed;
                    tracking.slowest_speed = speed;
                    CutEvent::CutStarted
                } else {
                    CutEvent::NoChange
                }
            }
            CutState::Cutting | CutState::SafeCutting => {
                tracking.slowest_speed = tracking.slowest_speed.min(speed);
                if tracking.state == CutState::Cutting
                    && !is_countable(config, tracking, ctx.now, speed, ctx.max_observed_speed)
                {
                    tracking.state = CutState::SafeCutting;
                }
                CutEvent::CutContinuing
            }
        };
    }

    if tyres_out == 0 && tracking.state != CutState::NotCutting {
        let countable = ctx.counting
            && is_countable(config, tracking, ctx.now, speed, ctx.max_observed_speed);
        tracking.state = CutState::NotCutting;
        return if countable {
            tracking.last_counted_at = Some(ctx.now);
            CutEvent::CutEndedPenalizable
        } else {
            CutEvent::CutEndedSafe
        };
    }

    if tracking.state == CutState::NotCutting {
        CutEvent::NoChange
    } else {
        CutEvent::CutContinuing
    }
}
