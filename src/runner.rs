use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::Sender,
};

use log::{debug, info};
use serde::Serialize;

use crate::{
    PenaltyError,
    engine::{CutEvent, Notification, PenaltyEngine},
    telemetry::TelemetryProducer,
};

/// What happened over a whole run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub ticks: usize,
    pub notifications: usize,
    pub counted_cuts: usize,
    pub warning_count: u32,
    pub penalty_pending: bool,
    pub max_observed_speed: f32,
}

fn log_notification(notification: &Notification) {
    match notification {
        Notification::Chat { message } => info!("chat {:?}: {}", message.channel, message.wire),
        Notification::Warning {
            text: Some(text), ..
        } => info!("warning: {}", text),
        Notification::Status { text: Some(text) } => info!("status: {}", text),
        other => debug!("{:?}", other),
    }
}

/// Feeds every sample of a started producer through the engine until the producer is
/// exhausted or `running` is cleared. Notifications are logged and forwarded to
/// `notification_sender` when one is given.
pub fn run_engine(
    producer: &mut impl TelemetryProducer,
    engine: &mut PenaltyEngine,
    notification_sender: Option<Sender<Notification>>,
    running: &AtomicBool,
) -> Result<RunSummary, PenaltyError> {
    let mut summary = RunSummary::default();

    while running.load(Ordering::SeqCst) {
        let Some(sample) = producer.sample()? else {
            break;
        };
        let report = engine.tick(&sample);
        summary.ticks += 1;

        if report.cut_event == CutEvent::CutEndedPenalizable {
            summary.counted_cuts += 1;
        }
        for notification in report.notifications {
            log_notification(&notification);
            summary.notifications += 1;
            if let Some(sender) = &notification_sender {
                sender.send(notification)?;
            }
        }
    }

    let state = engine.state();
    summary.warning_count = state.ledger.warning_count;
    summary.penalty_pending = state.ledger.penalty_active;
    summary.max_observed_speed = engine.max_observed_speed();
    Ok(summary)
}
