use std::path::Path;

use log::{debug, error};

use crate::PenaltyError;

use super::{SessionInfo, TelemetryOutput, TelemetrySample};

/// A trait for producing telemetry samples from the racing simulation.
///
/// The penalty engine never talks to the simulation directly. Whatever reads the
/// simulation's shared memory (or a recording of it) implements this trait and hands the
/// engine one [`TelemetrySample`] per tick.
///
/// # Lifecycle
///
/// 1. Call `start()` to initialize the connection to the data source
/// 2. Call `session_info()` to retrieve player, car and track identifiers
/// 3. Call `sample()` repeatedly until it returns `None`
pub trait TelemetryProducer {
    /// Initialize the telemetry producer and establish connection to the data source.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    fn start(&mut self) -> Result<(), PenaltyError>;

    /// Retrieve the static session information.
    ///
    /// # Errors
    ///
    /// Returns an error if the producer is not started.
    fn session_info(&mut self) -> Result<SessionInfo, PenaltyError>;

    /// Get the next telemetry sample, or `None` once the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the producer is not started.
    fn sample(&mut self) -> Result<Option<TelemetrySample>, PenaltyError>;
}

/// Replays recorded samples, either from memory or from a JSON Lines file of
/// [`TelemetryOutput`] records.
///
/// This is what drives the engine in tests and in the `replay` command.
pub struct ReplayTelemetryProducer {
    cur_tick: usize,
    started: bool,
    samples: Vec<TelemetrySample>,
    pub session_info: SessionInfo,
}

impl ReplayTelemetryProducer {
    pub fn from_samples(session_info: SessionInfo, samples: Vec<TelemetrySample>) -> Self {
        Self {
            cur_tick: 0,
            started: false,
            samples,
            session_info,
        }
    }

    /// Load a recording. The last `SessionChange` record in the file wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or a line is not a valid
    /// `TelemetryOutput` record.
    pub fn from_file(file: &Path) -> Result<Self, PenaltyError> {
        let lines = serde_jsonlines::json_lines::<TelemetryOutput, _>(file)
            .map_err(|e| PenaltyError::TelemetryFileError { source: e })?;

        let mut samples = Vec::new();
        let mut session_info = SessionInfo::default();
        for (line_no, line) in lines.enumerate() {
            let output = line.map_err(|e| {
                error!("Could not parse telemetry line {}: {}", line_no + 1, e);
                PenaltyError::TelemetryProducerError {
                    description: format!("Invalid record on line {}: {}", line_no + 1, e),
                }
            })?;

            match output {
                TelemetryOutput::DataPoint(sample) => samples.push(*sample),
                TelemetryOutput::SessionChange(info) => session_info = info,
            }
        }
        debug!("Loaded {} telemetry samples from {:?}", samples.len(), file);

        Ok(Self::from_samples(session_info, samples))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl TelemetryProducer for ReplayTelemetryProducer {
    fn start(&mut self) -> Result<(), PenaltyError> {
        self.started = true;
        Ok(())
    }

    fn session_info(&mut self) -> Result<SessionInfo, PenaltyError> {
        if !self.started {
            return Err(PenaltyError::TelemetryProducerError {
                description: "The replay is not started, call start() first.".to_string(),
            });
        }
        Ok(self.session_info.clone())
    }

    fn sample(&mut self) -> Result<Option<TelemetrySample>, PenaltyError> {
        if !self.started {
            return Err(PenaltyError::TelemetryProducerError {
                description: "The replay is not started, call start() first.".to_string(),
            });
        }

        let sample = self.samples.get(self.cur_tick).cloned();
        if sample.is_some() {
            self.cur_tick += 1;
        }
        Ok(sample)
    }
}
