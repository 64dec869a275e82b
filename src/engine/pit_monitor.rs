use log::{debug, info};
use serde::Serialize;

use crate::telemetry::{SessionKind, TelemetrySample};

use super::state::PitState;

/// Below this speed (km/h) the car counts as stopped for a pit stop.
const PIT_STOP_SPEED: f32 = 2.5;
/// Metres from the latched pit box that still count as being in it.
const PIT_BOX_RADIUS: f32 = 4.;

/// Pit stop boundaries seen this tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PitEvents {
    /// Stopped at the pit box, on this pit lane visit's lap
    pub pit_stop_started: Option<u32>,
    /// Left the pit box, with the litres of fuel added
    pub pit_stop_ended: Option<f32>,
}

fn distance(a: [f32; 3], b: [f32; 3]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

/// Latches the pit box position. On the first tick any session but a race starts in the
/// pits; afterwards it is taken the first time the sim reports the car in its box.
pub(crate) fn latch_pit_box(pit: &mut PitState, sample: &TelemetrySample, first_tick: bool) {
    if pit.pit_box.is_some() {
        return;
    }
    if (first_tick && sample.session != SessionKind::Race) || sample.is_in_pit {
        info!("Pit box latched at {:?}", sample.world_position);
        pit.pit_box = Some(sample.world_position);
    }
}

/// Tracks pit lane entries. Runs for every session.
pub(crate) fn track_pit_lane(pit: &mut PitState, sample: &TelemetrySample) -> bool {
    let mut new_lap_entry = false;
    if sample.is_in_pit_lane && !pit.was_in_pit_lane {
        new_lap_entry = sample.lap != pit.pit_lane_entered_on_lap;
        pit.pit_lane_entered_on_lap = sample.lap;
        debug!("Entered pit lane on lap {}", sample.lap);
    }
    pit.was_in_pit_lane = sample.is_in_pit_lane;
    new_lap_entry
}

/// Whether the car is stopped at its pit box during a race.
pub(crate) fn is_in_pit_stop(pit: &PitState, sample: &TelemetrySample) -> bool {
    if sample.session != SessionKind::Race
        || sample.speed_kmh >= PIT_STOP_SPEED
        || !sample.is_in_pit_lane
    {
        return false;
    }
    sample.is_in_pit
        || pit
            .pit_box
            .is_some_and(|pit_box| distance(pit_box, sample.world_position) < PIT_BOX_RADIUS)
}

pub(crate) fn is_speeding(sample: &TelemetrySample, pit_lane_speed: f32) -> bool {
    sample.is_in_pit_lane && sample.speed_kmh > pit_lane_speed
}

/// Pit stop start and end. A stop is only reported once per pit lane visit lap, so
/// creeping forward in the box does not count twice.
pub(crate) fn track_pit_stop(pit: &mut PitState, sample: &TelemetrySample) -> PitEvents {
    let in_pit_stop = is_in_pit_stop(pit, sample);
    let mut events = PitEvents::default();

    if !in_pit_stop && pit.was_in_pit_stop {
        let fuel_added = sample.fuel - pit.pit_stop_start_fuel;
        debug!("Pit stop ended, fuel {} -> {}", pit.pit_stop_start_fuel, sample.fuel);
        if fuel_added > 0. {
            events.pit_stop_ended = Some(fuel_added);
        }
        pit.was_in_pit_stop = false;
    }

    if in_pit_stop && pit.pit_lane_entered_on_lap != pit.last_pit_lane_entered_on_lap {
        info!("Pit stop on lap {}", pit.pit_lane_entered_on_lap);
        pit.last_pit_lane_entered_on_lap = pit.pit_lane_entered_on_lap;
        pit.pit_stop_start_fuel = sample.fuel;
        pit.was_in_pit_stop = true;
        events.pit_stop_started = Some(pit.pit_lane_entered_on_lap);
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn race(speed_kmh: f32, is_in_pit_lane: bool, is_in_pit: bool) -> TelemetrySample {
        TelemetrySample {
            session: SessionKind::Race,
            speed_kmh,
            is_in_pit_lane,
            is_in_pit,
            lap: 4,
            fuel: 20.,
            ..TelemetrySample::default()
        }
    }

    #[test]
    fn test_pit_box_latch() {
        let mut pit = PitState::default();
        let mut sample = race(0., false, false);
        sample.world_position = [10., 0., 5.];

        latch_pit_box(&mut pit, &sample, true);
        assert_eq!(pit.pit_box, None);

        sample.session = SessionKind::Practice;
        latch_pit_box(&mut pit, &sample, true);
        assert_eq!(pit.pit_box, Some([10., 0., 5.]));

        // latched once only
        sample.world_position = [0., 0., 0.];
        sample.is_in_pit = true;
        latch_pit_box(&mut pit, &sample, false);
        assert_eq!(pit.pit_box, Some([10., 0., 5.]));
    }

    #[test]
    fn test_pit_lane_entry_once_per_lap() {
        let mut pit = PitState::default();
        assert!(track_pit_lane(&mut pit, &race(60., true, false)));
        assert!(!track_pit_lane(&mut pit, &race(60., true, false)));
        assert!(!track_pit_lane(&mut pit, &race(60., false, false)));
        // limiter flicking on again on the same lap
        assert!(!track_pit_lane(&mut pit, &race(60., true, false)));
        assert_eq!(pit.pit_lane_entered_on_lap, 4);
    }

    #[test]
    fn test_pit_stop_near_box() {
        let mut pit = PitState {
            pit_box: Some([100., 0., 100.]),
            ..PitState::default()
        };
        let mut sample = race(1., true, false);
        sample.world_position = [102., 0., 101.];
        assert!(is_in_pit_stop(&pit, &sample));

        sample.world_position = [110., 0., 100.];
        assert!(!is_in_pit_stop(&pit, &sample));

        sample.is_in_pit = true;
        assert!(is_in_pit_stop(&pit, &sample));

        sample.session = SessionKind::Qualify;
        assert!(!is_in_pit_stop(&pit, &sample));

        pit.pit_box = None;
        assert!(!is_in_pit_stop(&pit, &race(1., true, false)));
    }

    #[test]
    fn test_pit_stop_reports_fuel() {
        let mut pit = PitState::default();
        track_pit_lane(&mut pit, &race(60., true, false));

        let events = track_pit_stop(&mut pit, &race(0., true, true));
        assert_eq!(events.pit_stop_started, Some(4));

        let mut refuelled = race(0., true, true);
        refuelled.fuel = 45.;
        assert_eq!(track_pit_stop(&mut pit, &refuelled), PitEvents::default());

        let mut leaving = race(30., true, false);
        leaving.fuel = 45.;
        let events = track_pit_stop(&mut pit, &leaving);
        assert_eq!(events.pit_stop_ended, Some(25.));

        // stopping again on the same pit lane visit is not a new stop
        let events = track_pit_stop(&mut pit, &race(0., true, true));
        assert_eq!(events.pit_stop_started, None);
    }

    #[test]
    fn test_speeding() {
        assert!(is_speeding(&race(90., true, false), 82.));
        assert!(!is_speeding(&race(80., true, false), 82.));
        assert!(!is_speeding(&race(200., false, false), 82.));
    }
}
