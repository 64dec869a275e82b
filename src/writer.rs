use std::{
    fs::File,
    io::BufWriter,
    path::Path,
    sync::mpsc::Receiver,
};

use log::error;
use serde_jsonlines::JsonLinesWriter;

use crate::{PenaltyError, engine::Notification};

/// Writes every notification received as one JSON line, until the sending side hangs up.
pub fn write_notifications(
    file: &Path,
    notification_receiver: Receiver<Notification>,
) -> Result<usize, PenaltyError> {
    let notifications_file =
        File::create(file).map_err(|e| PenaltyError::WriterError { source: e })?;
    let mut writer = JsonLinesWriter::new(BufWriter::new(notifications_file));

    let mut written = 0;
    for notification in &notification_receiver {
        match writer.write(&notification) {
            Ok(()) => written += 1,
            Err(e) => error!("Error while writing notification to output file: {}", e),
        }
    }
    writer
        .flush()
        .map_err(|e| PenaltyError::WriterError { source: e })?;
    Ok(written)
}
