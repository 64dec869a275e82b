// Library interface for pitlane-penalty
// This allows integration tests to access internal modules

pub mod chat;
pub mod config;
pub mod engine;
pub mod errors;
pub mod runner;
pub mod speed_store;
pub mod telemetry;
pub mod writer;

// Re-export commonly used types
pub use config::{CalendarDay, PenaltyConfig, PenaltyMode};
pub use engine::{CutEvent, Indicator, Notification, PenaltyEngine, TickReport};
pub use errors::PenaltyError;
pub use speed_store::{FileSpeedStore, SpeedStore};
pub use telemetry::{
    ReplayTelemetryProducer, SessionInfo, SessionKind, TelemetryOutput, TelemetryProducer,
    TelemetrySample,
};
