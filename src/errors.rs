// Error types for pitlane-penalty

use snafu::Snafu;
use std::{io, sync::mpsc::SendError};

use crate::engine::Notification;

#[derive(Debug, Snafu)]
pub enum PenaltyError {
    // Config management errors
    #[snafu(display("Could not find application config directory"))]
    NoConfigDir,
    #[snafu(display("Error reading config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error parsing config file"))]
    ConfigParseError { source: serde_json::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },
    #[snafu(display("Invalid config setting: {field} - {reason}"))]
    InvalidConfig { field: String, reason: String },

    // Max speed store errors
    #[snafu(display("Could not find application data directory for the speed store"))]
    NoDataDir,
    #[snafu(display("Error accessing speed store"))]
    SpeedStoreIOError { source: io::Error },
    #[snafu(display("Speed store is corrupt"))]
    SpeedStoreParseError { source: serde_json::Error },

    // Errors while reading telemetry samples
    #[snafu(display("Telemetry producer error: {description}"))]
    TelemetryProducerError { description: String },
    #[snafu(display("Error opening telemetry file"))]
    TelemetryFileError { source: io::Error },

    // Errors for the notification writer
    #[snafu(display("Error writing notifications file"))]
    WriterError { source: io::Error },
    #[snafu(display("Error sending notification to the writer"))]
    NotificationSendError {
        source: Box<SendError<Notification>>,
    },
}

impl From<SendError<Notification>> for PenaltyError {
    fn from(value: SendError<Notification>) -> Self {
        PenaltyError::NotificationSendError {
            source: Box::new(value),
        }
    }
}
