use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use chrono::{Datelike, Local};
use itertools::Itertools;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{PenaltyError, telemetry::SessionKind};

const CONFIG_DIR_NAME: &str = "pitlane-penalty";
const CONFIG_FILE_NAME: &str = "plp.json";
const DAY_SUFFIXES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// How a penalty is served.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PenaltyMode {
    /// Drive through pit lane without stopping within a number of laps
    DriveThrough,
    /// Seconds added to the final race result
    Time,
}

impl PenaltyMode {
    fn code(&self) -> u8 {
        match self {
            PenaltyMode::DriveThrough => 1,
            PenaltyMode::Time => 2,
        }
    }
}

/// The calendar day the engine runs on. Day-dependent settings and the start light hold
/// time are derived from it, so it is captured once and passed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalendarDay {
    /// 0 = Monday .. 6 = Sunday
    pub weekday: u8,
    /// 1..=31
    pub day_of_month: u32,
}

impl CalendarDay {
    pub fn today() -> Self {
        let now = Local::now();
        Self {
            weekday: now.weekday().num_days_from_monday() as u8,
            day_of_month: now.day(),
        }
    }

    fn suffix(&self) -> &'static str {
        DAY_SUFFIXES[usize::from(self.weekday) % DAY_SUFFIXES.len()]
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PenaltyConfig {
    /// Name of the configuration, reported in the version chat line
    pub cfg_name: String,
    /// A cut needs more than this many tyres off track
    pub wheels_out: u8,
    /// Cuts below this speed (km/h) are ignored
    pub min_speed: f32,
    /// Seconds a cut warning stays on screen
    pub warning_duration_s: f64,
    /// Seconds a broadcast chat message stays on screen
    pub chat_duration_s: f64,
    pub total_warnings: u32,
    pub enable_penalties: bool,
    pub laps_to_take_penalty: u32,
    pub penalty_mode_cutting: PenaltyMode,
    pub penalty_mode_speeding: PenaltyMode,
    pub enable_speeding_penalties: bool,
    /// Pit lane speed limit in km/h
    pub pit_lane_speed: f32,
    /// Minimum seconds between two counted cuts
    pub seconds_between_cuts: f64,
    pub use_start_lights: bool,
    pub use_flag_images: bool,
    pub jump_start_penalty_seconds: u32,
    /// Days (0 = Monday) the app is enabled on. Empty means every day.
    pub enabled_days: Vec<u8>,
    /// Server name fragments the app is enabled on. Empty means every server.
    pub enabled_server_filter: Vec<String>,
    /// Race laps during which cuts never count
    pub amnesty_laps: u32,
    /// Sessions in which cuts are counted. Empty means every session.
    pub show_cuts_in_sessions: Vec<SessionKind>,
    /// Days the race count-up timer is shown. `None` disables it.
    pub race_countup_timer_days: Option<Vec<u8>>,
    /// Team number for team chat, 0 disables team messages
    pub team: u32,
    pub team_car: u32,

    // Fine tuning
    pub max_cut_time_s: f64,
    pub min_slow_down_ratio: f32,
    pub max_speed_ratio_for_cut: f32,
    pub qual_slow_down_speed: f32,
    pub seconds_per_cutting_penalty: u32,
    pub seconds_per_speeding_penalty: u32,
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            cfg_name: "default".to_string(),
            wheels_out: 3,
            min_speed: 50.,
            warning_duration_s: 10.,
            chat_duration_s: 10.,
            total_warnings: 3,
            enable_penalties: true,
            laps_to_take_penalty: 3,
            penalty_mode_cutting: PenaltyMode::DriveThrough,
            penalty_mode_speeding: PenaltyMode::DriveThrough,
            enable_speeding_penalties: true,
            pit_lane_speed: 82.,
            seconds_between_cuts: 10.,
            use_start_lights: true,
            use_flag_images: true,
            jump_start_penalty_seconds: 0,
            enabled_days: Vec::new(),
            enabled_server_filter: Vec::new(),
            amnesty_laps: 1,
            show_cuts_in_sessions: vec![
                SessionKind::Practice,
                SessionKind::Qualify,
                SessionKind::Race,
                SessionKind::Hotlap,
            ],
            race_countup_timer_days: None,
            team: 0,
            team_car: 1,
            max_cut_time_s: 1.3,
            min_slow_down_ratio: 0.9,
            max_speed_ratio_for_cut: 0.5,
            qual_slow_down_speed: 50.,
            seconds_per_cutting_penalty: 10,
            seconds_per_speeding_penalty: 10,
        }
    }
}

impl PenaltyConfig {
    pub fn default_config_dir() -> Result<PathBuf, PenaltyError> {
        Ok(dirs::config_dir()
            .ok_or(PenaltyError::NoConfigDir)?
            .join(CONFIG_DIR_NAME))
    }

    pub fn from_file(path: &Path) -> Result<Self, PenaltyError> {
        let file = File::open(path).map_err(|e| PenaltyError::ConfigIOError { source: e })?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| PenaltyError::ConfigParseError { source: e })
    }

    /// Picks the configuration file for the given day: `plp-<Day>.json` if it exists in
    /// `config_dir`, otherwise `plp.json`. Returns the defaults when neither exists.
    pub fn resolve(config_dir: &Path, day: CalendarDay) -> Result<Self, PenaltyError> {
        let day_path = config_dir.join(format!("plp-{}.json", day.suffix()));
        if day_path.exists() {
            info!("Using day specific config {:?}", day_path);
            return Self::from_file(&day_path);
        }

        let path = config_dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            info!("Using config {:?}", path);
            Self::from_file(&path)
        } else {
            debug!("No config file in {:?}, using defaults", config_dir);
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), PenaltyError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| PenaltyError::ConfigIOError { source: e })?;
            }
        }

        let file = File::create(path).map_err(|e| PenaltyError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| PenaltyError::ConfigSerializeError { source: e })
    }

    /// A server named like `"... P6"` runs with 6 warnings before a penalty.
    pub fn apply_server_name(&mut self, server_name: &str) {
        let name = server_name.trim_end().to_uppercase();
        let digits: String = name
            .chars()
            .rev()
            .take_while(|c| c.is_ascii_digit())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        if digits.is_empty() || !name[..name.len() - digits.len()].ends_with('P') {
            return;
        }
        if let Ok(total) = digits.parse::<u32>() {
            info!(
                "Server {} sets total warnings to {} (was {})",
                server_name, total, self.total_warnings
            );
            self.total_warnings = total;
        }
    }

    pub fn validate(&self) -> Result<(), PenaltyError> {
        fn invalid(field: &str, reason: &str) -> Result<(), PenaltyError> {
            Err(PenaltyError::InvalidConfig {
                field: field.to_string(),
                reason: reason.to_string(),
            })
        }

        if self.wheels_out > 3 {
            return invalid("wheels_out", "must be between 0 and 3");
        }
        if self.min_speed < 0. {
            return invalid("min_speed", "cannot be negative");
        }
        if self.laps_to_take_penalty == 0 {
            return invalid("laps_to_take_penalty", "must be at least 1");
        }
        if !(self.min_slow_down_ratio > 0. && self.min_slow_down_ratio <= 1.) {
            return invalid("min_slow_down_ratio", "must be in (0, 1]");
        }
        if !(self.max_speed_ratio_for_cut > 0. && self.max_speed_ratio_for_cut <= 1.) {
            return invalid("max_speed_ratio_for_cut", "must be in (0, 1]");
        }
        for (field, value) in [
            ("max_cut_time_s", self.max_cut_time_s),
            ("warning_duration_s", self.warning_duration_s),
            ("chat_duration_s", self.chat_duration_s),
            ("seconds_between_cuts", self.seconds_between_cuts),
        ] {
            if !value.is_finite() || value < 0. {
                return invalid(field, "must be a positive number of seconds");
            }
        }
        if self.enabled_days.iter().any(|d| *d > 6) {
            return invalid("enabled_days", "days are numbered 0 (Monday) to 6 (Sunday)");
        }
        Ok(())
    }

    /// Loads the configuration for the day, then applies the server name override and
    /// validates it.
    pub fn load(
        path: Option<&Path>,
        day: CalendarDay,
        server_name: &str,
    ) -> Result<Self, PenaltyError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::resolve(&Self::default_config_dir()?, day)?,
        };
        config.apply_server_name(server_name);
        config.validate()?;
        Ok(config)
    }

    /// Whether the app runs at full strength for this day and server. A disabled app still
    /// shows cut warnings, but sends no chat and issues no penalties.
    pub fn is_enabled(&self, day: CalendarDay, server_name: &str) -> bool {
        let day_enabled = self.enabled_days.is_empty() || self.enabled_days.contains(&day.weekday);

        let server = server_name.to_uppercase();
        let server_enabled = self.enabled_server_filter.is_empty()
            || self
                .enabled_server_filter
                .iter()
                .any(|name| server.contains(&name.to_uppercase()));

        day_enabled && server_enabled
    }

    pub fn is_session_enabled(&self, session: SessionKind) -> bool {
        self.show_cuts_in_sessions.is_empty() || self.show_cuts_in_sessions.contains(&session)
    }

    pub fn is_race_countup_timer_enabled(&self, day: CalendarDay) -> bool {
        match &self.race_countup_timer_days {
            None => false,
            Some(days) => days.is_empty() || days.contains(&day.weekday),
        }
    }

    /// Settings for a day and server where the app is disabled.
    pub fn restricted(&self) -> Self {
        warn!("Pit lane penalties are disabled on this day or server");
        Self {
            use_start_lights: false,
            enable_speeding_penalties: false,
            ..self.clone()
        }
    }

    pub fn has_drive_through_mode(&self) -> bool {
        self.penalty_mode_cutting == PenaltyMode::DriveThrough
            || self.penalty_mode_speeding == PenaltyMode::DriveThrough
    }

    /// The settings that change penalty behaviour, as reported in the version chat line.
    pub fn summary(&self) -> String {
        let sessions = self
            .show_cuts_in_sessions
            .iter()
            .map(SessionKind::index)
            .join(",");
        [
            self.wheels_out.to_string(),
            self.min_speed.to_string(),
            self.total_warnings.to_string(),
            self.enable_penalties.to_string(),
            self.max_cut_time_s.to_string(),
            self.min_slow_down_ratio.to_string(),
            self.laps_to_take_penalty.to_string(),
            self.penalty_mode_cutting.code().to_string(),
            self.penalty_mode_speeding.code().to_string(),
            self.pit_lane_speed.to_string(),
            self.amnesty_laps.to_string(),
            sessions,
        ]
        .iter()
        .join("-")
    }
}
