use serde::Serialize;

/// Count-up timer shown from the moment the lights go out until the car gets moving.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RaceTimer {
    shown: Option<u32>,
    removed: bool,
}

impl RaceTimer {
    /// Returns the new timer text when it changes: `Some(seconds)` to show, `None` to remove.
    pub fn update(&mut self, is_race: bool, lap_time_ms: u32, speed_kmh: f32) -> Option<Option<u32>> {
        if !is_race || self.removed || lap_time_ms == 0 {
            return None;
        }

        if speed_kmh > 3. {
            self.removed = true;
            return self.shown.take().map(|_| None);
        }

        let seconds = lap_time_ms / 1000;
        if self.shown == Some(seconds) {
            None
        } else {
            self.shown = Some(seconds);
            Some(Some(seconds))
        }
    }

    /// Clears the timer for a new session. Returns true if it was showing.
    pub fn reset(&mut self) -> bool {
        let was_shown = self.shown.is_some();
        *self = Self::default();
        was_shown
    }
}
