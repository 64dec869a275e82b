use serde::Serialize;

use super::notifier::{Lamp, LightsFrame};

/// Stages of the start light gantry. Stages only move forward until the next race start.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum StartStage {
    #[default]
    Idle,
    /// Shown with every lamp off
    Armed,
    Light1,
    Light2,
    Light3,
    Light4,
    Light5,
    AllOff,
    Hidden,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum LightColour {
    #[default]
    Red,
    /// Used after a jump start
    Yellow,
}

impl From<LightColour> for Lamp {
    fn from(colour: LightColour) -> Self {
        match colour {
            LightColour::Red => Lamp::Red,
            LightColour::Yellow => Lamp::Yellow,
        }
    }
}

/// Seconds the five lights stay on before going out, in `[1, 4)`.
///
/// Every player in the same race computes the same value, so the lights go out at the
/// same moment for everybody.
pub fn light_hold_seconds(track_name_len: usize, number_of_laps: u32, day_of_month: u32) -> f64 {
    let seed = (track_name_len as u64)
        .wrapping_mul(u64::from(number_of_laps))
        .wrapping_mul(u64::from(day_of_month));
    let bits = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345) & 0x7FFF_FFFF;
    bits as f64 / f64::from(0x8000_0000u32) * 3. + 1.
}

/// Race start sequencing. Times are seconds since the race session began.
#[derive(Clone, Debug, Default, Serialize)]
pub struct StartSequence {
    pub stage: StartStage,
    pub elapsed: f64,
    /// When the first light comes on, one second after the lap timer starts
    pub start_at: Option<f64>,
    pub hold_s: f64,
    pub colour: LightColour,
    pub jump_start_flagged: bool,
    lamps: [Lamp; 5],
}

impl StartSequence {
    /// Back to `Idle`, ready for a new race start.
    pub fn race_start(&mut self) {
        *self = Self::default();
    }

    pub fn lights_out(&self) -> bool {
        self.stage >= StartStage::AllOff
    }

    fn is_due(&self, stage: StartStage) -> bool {
        let Some(start) = self.start_at else {
            return stage == StartStage::Idle && self.elapsed > 0.;
        };
        let after = |offset: f64| self.elapsed > start + offset;
        match stage {
            StartStage::Idle => self.elapsed > 0.,
            StartStage::Armed => after(0.),
            StartStage::Light1 => after(1.),
            StartStage::Light2 => after(2.),
            StartStage::Light3 => after(3.),
            StartStage::Light4 => after(4.),
            StartStage::Light5 => after(5. + self.hold_s),
            StartStage::AllOff => after(6. + self.hold_s),
            StartStage::Hidden => false,
        }
    }

    fn next_stage(stage: StartStage) -> StartStage {
        match stage {
            StartStage::Idle => StartStage::Armed,
            StartStage::Armed => StartStage::Light1,
            StartStage::Light1 => StartStage::Light2,
            StartStage::Light2 => StartStage::Light3,
            StartStage::Light3 => StartStage::Light4,
            StartStage::Light4 => StartStage::Light5,
            StartStage::Light5 => StartStage::AllOff,
            StartStage::AllOff | StartStage::Hidden => StartStage::Hidden,
        }
    }

    /// Moves the sequence on by at most one stage. Returns the new gantry frame when
    /// the stage changed.
    pub fn advance(&mut self, delta_s: f64, lap_time_ms: u32, hold_s: f64) -> Option<LightsFrame> {
        self.elapsed += delta_s;
        if lap_time_ms > 0 && self.start_at.is_none() {
            self.start_at = Some(self.elapsed + 1.);
        }

        if !self.is_due(self.stage) {
            return None;
        }
        self.stage = Self::next_stage(self.stage);
        match self.stage {
            StartStage::Armed => {
                self.hold_s = hold_s;
                self.lamps = [Lamp::Off; 5];
            }
            StartStage::Light1
            | StartStage::Light2
            | StartStage::Light3
            | StartStage::Light4
            | StartStage::Light5 => {
                let lit = self.stage as usize - StartStage::Light1 as usize;
                self.lamps[lit] = self.colour.into();
            }
            StartStage::AllOff => self.lamps = [Lamp::Off; 5],
            StartStage::Idle | StartStage::Hidden => return Some(LightsFrame::hidden()),
        }
        Some(LightsFrame {
            visible: true,
            lamps: self.lamps,
        })
    }

    /// Flags a jump start: the car moved after the sim's lights went out but before ours
    /// did. Flags at most once per race start. Lights lit afterwards are yellow.
    pub fn check_jump_start(&mut self, lap_time_ms: u32, speed_kmh: f32, lap: u32) -> bool {
        if lap_time_ms > 0
            && !self.lights_out()
            && speed_kmh > 0.5
            && lap == 1
            && !self.jump_start_flagged
        {
            self.jump_start_flagged = true;
            self.colour = LightColour::Yellow;
            return true;
        }
        false
    }
}
