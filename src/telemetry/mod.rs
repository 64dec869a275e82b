pub mod producer;

use std::fmt::Display;

use serde::{Deserialize, Serialize};

pub use producer::{ReplayTelemetryProducer, TelemetryProducer};

/// Session kinds reported by the simulation, in the order of their numeric ids.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionKind {
    #[default]
    Practice,
    Qualify,
    Race,
    Hotlap,
    TimeAttack,
    Drift,
    Drag,
}

impl SessionKind {
    /// Maps the simulation's numeric session id. Unknown ids are treated as practice.
    pub fn from_index(index: i32) -> Self {
        match index {
            1 => Self::Qualify,
            2 => Self::Race,
            3 => Self::Hotlap,
            4 => Self::TimeAttack,
            5 => Self::Drift,
            6 => Self::Drag,
            _ => Self::Practice,
        }
    }

    pub fn index(&self) -> i32 {
        match self {
            Self::Practice => 0,
            Self::Qualify => 1,
            Self::Race => 2,
            Self::Hotlap => 3,
            Self::TimeAttack => 4,
            Self::Drift => 5,
            Self::Drag => 6,
        }
    }

    /// Sessions in which track cuts are tracked at all.
    pub fn supports_cut_detection(&self) -> bool {
        matches!(
            self,
            Self::Practice | Self::Qualify | Self::Race | Self::Hotlap
        )
    }
}

impl Display for SessionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionKind::Practice => write!(f, "Practice"),
            SessionKind::Qualify => write!(f, "Qualify"),
            SessionKind::Race => write!(f, "Race"),
            SessionKind::Hotlap => write!(f, "Hotlap"),
            SessionKind::TimeAttack => write!(f, "Time Attack"),
            SessionKind::Drift => write!(f, "Drift"),
            SessionKind::Drag => write!(f, "Drag"),
        }
    }
}

/// One tick worth of telemetry for the player's car.
///
/// Samples are validated by whoever produces them: speeds are never negative and the
/// lap number starts at 1.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TelemetrySample {
    /// Seconds elapsed since the previous sample
    pub delta_s: f64,
    /// Current speed in km/h
    pub speed_kmh: f32,
    /// Number of tyres the simulation reports as off track (0-4)
    pub tyres_out: u8,
    /// Tyre dirt level, FL/FR/RL/RR
    pub dirt_levels: [f32; 4],
    /// Current lap, completed laps + 1
    pub lap: u32,
    pub is_in_pit_lane: bool,
    /// Whether the car is in its pit box
    pub is_in_pit: bool,
    pub session: SessionKind,
    /// Seconds left in the session, infinite for lap-limited sessions
    #[serde(with = "unbounded_seconds")]
    pub session_time_left_s: f64,
    pub world_position: [f32; 3],
    /// Current lap time. Stays at 0 until the start lights go out.
    pub lap_time_ms: u32,
    /// Fuel in litres
    pub fuel: f32,
}

impl Default for TelemetrySample {
    fn default() -> Self {
        Self {
            delta_s: 0.,
            speed_kmh: 0.,
            tyres_out: 0,
            dirt_levels: [0.; 4],
            lap: 1,
            is_in_pit_lane: false,
            is_in_pit: false,
            session: SessionKind::Practice,
            session_time_left_s: f64::INFINITY,
            world_position: [0.; 3],
            lap_time_ms: 0,
            fuel: 0.,
        }
    }
}

/// JSON has no infinity, an unbounded session clock is written as `null`.
mod unbounded_seconds {
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

/// Static information about the session the player joined.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionInfo {
    pub player_name: String,
    pub car_name: String,
    pub track_name: String,
    pub track_configuration: String,
    pub server_name: String,
    /// Laps configured for the race
    pub number_of_laps: u32,
}

impl Default for SessionInfo {
    fn default() -> Self {
        Self {
            player_name: "Unknown".to_string(),
            car_name: "Unknown".to_string(),
            track_name: "Unknown".to_string(),
            track_configuration: String::new(),
            server_name: String::new(),
            number_of_laps: 0,
        }
    }
}

impl SessionInfo {
    /// Key under which the best speed of this car/track/layout combination is stored.
    pub fn max_speed_key(&self) -> String {
        format!(
            "{}{}{}",
            self.car_name, self.track_name, self.track_configuration
        )
    }
}

/// A line in a recorded telemetry file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum TelemetryOutput {
    SessionChange(SessionInfo),
    DataPoint(Box<TelemetrySample>),
}
