// Chat message encoding for the simulation's chat channel.
//
// Every message the engine sends starts with a tag so peers running the same app know
// which ones to display. Text after the delimiter is only meant for the server log.

use serde::{Deserialize, Serialize};

pub const CHAT_TAG: &str = "PLP>";
pub const TEAM_CHAT_TAG: &str = "PLT>";
pub const LOG_TAG: &str = "PLP: ";
pub const CHAT_DELIM: char = '|';

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatChannel {
    /// Shown by every peer running the app
    Broadcast,
    /// Shown only by members of the same team
    Team,
    /// Recorded in the server log, never displayed
    Log,
}

/// A message ready to hand to the chat transport.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub channel: ChatChannel,
    pub wire: String,
}

impl ChatMessage {
    pub fn broadcast(body: &str, sender: &str) -> Self {
        Self {
            channel: ChatChannel::Broadcast,
            wire: format!("{CHAT_TAG}{body}{CHAT_DELIM}{sender}"),
        }
    }

    pub fn team(team: u32, body: &str) -> Self {
        Self {
            channel: ChatChannel::Team,
            wire: format!("{TEAM_CHAT_TAG}{team}: {body}"),
        }
    }

    pub fn log(body: &str, sender: &str) -> Self {
        Self {
            channel: ChatChannel::Log,
            wire: format!("{LOG_TAG}{body}{CHAT_DELIM}{sender}"),
        }
    }
}

/// Who we are, for filtering incoming team messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocalIdentity {
    pub team: u32,
    pub team_car: u32,
}

/// Decides what to display for an incoming chat message.
///
/// Returns `None` when the message must be ignored. An empty string clears the chat line.
pub fn display_text(message: &str, author: &str, local: LocalIdentity) -> Option<String> {
    let (stripped, is_team_tagged) = if let Some(rest) = message.strip_prefix(CHAT_TAG) {
        (rest, false)
    } else if let Some(rest) = message.strip_prefix(TEAM_CHAT_TAG) {
        (rest, true)
    } else {
        return None;
    };

    let mut text = stripped;
    let mut team_message = false;
    if is_team_tagged {
        if let Some((team, rest)) = split_team_prefix(stripped) {
            if team != local.team {
                return None;
            }
            if sent_by_car(rest) == Some(local.team_car) {
                return None;
            }
            team_message = true;
            text = rest;
        }
    }

    let text = match text.find(CHAT_DELIM) {
        Some(pos) => &text[..pos],
        None => text,
    };

    if text.is_empty() || team_message {
        Some(text.to_string())
    } else {
        Some(format!("{author} {text}"))
    }
}

/// Splits `"<team>: <rest>"`.
fn split_team_prefix(text: &str) -> Option<(u32, &str)> {
    let (team, rest) = text.split_once(": ")?;
    if team.is_empty() || !team.chars().all(|c| c.is_ascii_digit()) || rest.is_empty() {
        return None;
    }
    Some((team.parse().ok()?, rest))
}

/// Car number from a `"Car <n> ..."` message.
fn sent_by_car(text: &str) -> Option<u32> {
    let prefix = text.get(..4)?;
    if !prefix.eq_ignore_ascii_case("car ") {
        return None;
    }
    let (number, _) = text[4..].split_once(' ')?;
    number.parse().ok()
}
