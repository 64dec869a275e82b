use serde::Serialize;

use crate::chat::ChatMessage;

/// Seconds between two visibility toggles of a blinking text.
pub const BLINK_INTERVAL_S: f64 = 1.;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TextColour {
    Red,
    Yellow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Flag {
    /// Black and white flag, shown with a cut warning
    BlackWhite,
    /// Black flag, shown with a drive through penalty
    Black,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum Lamp {
    #[default]
    Off,
    Red,
    Yellow,
}

/// What the start light gantry should look like.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct LightsFrame {
    pub visible: bool,
    pub lamps: [Lamp; 5],
}

impl LightsFrame {
    pub fn hidden() -> Self {
        Self {
            visible: false,
            lamps: [Lamp::Off; 5],
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum BlinkTarget {
    Status,
    Warning,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum BlinkDirective {
    /// Toggle visibility every `interval_s`. Blinking ends once the session clock passes
    /// `stop_at`, if set.
    Start {
        interval_s: f64,
        stop_at: Option<f64>,
    },
    /// Stop blinking and leave the text shown.
    Stop,
}

/// Outbound events for the rendering and chat collaborators, in the order they happened.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    Status {
        text: Option<String>,
    },
    StatusVisible {
        visible: bool,
    },
    Warning {
        text: Option<String>,
        colour: TextColour,
    },
    WarningVisible {
        visible: bool,
    },
    Blink {
        target: BlinkTarget,
        directive: BlinkDirective,
    },
    Chat {
        message: ChatMessage,
    },
    Flag {
        flag: Flag,
        visible: bool,
    },
    StartLights {
        frame: LightsFrame,
    },
    RaceTimer {
        seconds: Option<u32>,
    },
}

#[derive(Debug, PartialEq, Eq)]
enum BlinkStep {
    Toggled(bool),
    Finished,
}

/// Poll driven blink timer. All times are on the engine's session clock.
#[derive(Clone, Debug)]
struct Blinker {
    active: bool,
    showing: bool,
    next_toggle: f64,
    stop_at: Option<f64>,
}

impl Default for Blinker {
    fn default() -> Self {
        Self {
            active: false,
            showing: true,
            next_toggle: 0.,
            stop_at: None,
        }
    }
}

impl Blinker {
    fn start(&mut self, now: f64, stop_at: Option<f64>) {
        self.active = true;
        self.showing = true;
        self.next_toggle = now + BLINK_INTERVAL_S;
        self.stop_at = stop_at;
    }

    /// Start blinking in phase with `other` if it is blinking.
    fn start_in_step_with(&mut self, other: &Blinker, now: f64, stop_at: Option<f64>) {
        self.start(now, stop_at);
        if other.active {
            self.next_toggle = other.next_toggle;
            self.showing = other.showing;
        }
    }

    fn stop(&mut self) {
        *self = Self::default();
    }

    fn poll(&mut self, now: f64) -> Option<BlinkStep> {
        if !self.active || now <= self.next_toggle {
            return None;
        }
        self.showing = !self.showing;
        self.next_toggle = now + BLINK_INTERVAL_S;
        match self.stop_at {
            Some(stop_at) if stop_at < now => {
                self.stop();
                Some(BlinkStep::Finished)
            }
            _ => Some(BlinkStep::Toggled(self.showing)),
        }
    }
}

/// Turns engine transitions into [`Notification`]s.
///
/// Texts are only re-emitted when they change, so a transition repeated on every tick
/// shows up once downstream.
pub(crate) struct Notifier {
    now: f64,
    sender: String,
    chat_enabled: bool,
    flags_enabled: bool,
    chat_duration_s: f64,
    pending: Vec<Notification>,
    status: Option<String>,
    warning: Option<(String, TextColour)>,
    flags_shown: [bool; 2],
    status_blink: Blinker,
    warning_blink: Blinker,
    erase_warning_at: Option<f64>,
    erase_chat_at: Option<f64>,
}

impl Notifier {
    pub(crate) fn new(
        sender: &str,
        chat_enabled: bool,
        flags_enabled: bool,
        chat_duration_s: f64,
    ) -> Self {
        Self {
            now: 0.,
            sender: sender.to_string(),
            chat_enabled,
            flags_enabled,
            chat_duration_s,
            pending: Vec::new(),
            status: None,
            warning: None,
            flags_shown: [false; 2],
            status_blink: Blinker::default(),
            warning_blink: Blinker::default(),
            erase_warning_at: None,
            erase_chat_at: None,
        }
    }

    pub(crate) fn set_clock(&mut self, now: f64) {
        self.now = now;
    }

    pub(crate) fn drain(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn set_status(&mut self, text: Option<String>) {
        if self.status != text {
            self.status = text.clone();
            self.pending.push(Notification::Status { text });
        }
    }

    #[cfg(test)]
    pub(crate) fn warning_text(&self) -> Option<&str> {
        self.warning.as_ref().map(|(text, _)| text.as_str())
    }

    pub(crate) fn set_warning(&mut self, text: &str, colour: TextColour) {
        let warning = Some((text.to_string(), colour));
        if self.warning != warning {
            self.warning = warning;
            self.pending.push(Notification::Warning {
                text: Some(text.to_string()),
                colour,
            });
        }
    }

    pub(crate) fn clear_warning(&mut self) {
        if let Some((_, colour)) = self.warning.take() {
            self.pending.push(Notification::Warning { text: None, colour });
        }
    }

    pub(crate) fn erase_warning_after(&mut self, seconds: f64) {
        self.erase_warning_at = Some(self.now + seconds);
    }

    pub(crate) fn cancel_warning_erase(&mut self) {
        self.erase_warning_at = None;
    }

    pub(crate) fn broadcast(&mut self, body: &str) {
        if self.chat_enabled {
            let message = ChatMessage::broadcast(body, &self.sender);
            self.pending.push(Notification::Chat { message });
            self.erase_chat_at = Some(self.now + self.chat_duration_s);
        }
    }

    pub(crate) fn team(&mut self, team: u32, body: &str) {
        if self.chat_enabled {
            let message = ChatMessage::team(team, body);
            self.pending.push(Notification::Chat { message });
            self.erase_chat_at = Some(self.now + self.chat_duration_s);
        }
    }

    pub(crate) fn log(&mut self, body: &str) {
        if self.chat_enabled {
            let message = ChatMessage::log(body, &self.sender);
            self.pending.push(Notification::Chat { message });
        }
    }

    pub(crate) fn show_flag(&mut self, flag: Flag) {
        self.set_flag(flag, true);
    }

    pub(crate) fn hide_flag(&mut self, flag: Flag) {
        self.set_flag(flag, false);
    }

    fn set_flag(&mut self, flag: Flag, visible: bool) {
        let slot = match flag {
            Flag::BlackWhite => 0,
            Flag::Black => 1,
        };
        if self.flags_enabled && self.flags_shown[slot] != visible {
            self.flags_shown[slot] = visible;
            self.pending.push(Notification::Flag { flag, visible });
        }
    }

    pub(crate) fn start_lights(&mut self, frame: LightsFrame) {
        self.pending.push(Notification::StartLights { frame });
    }

    pub(crate) fn race_timer(&mut self, seconds: Option<u32>) {
        self.pending.push(Notification::RaceTimer { seconds });
    }

    pub(crate) fn start_status_blink(&mut self, stop_after: Option<f64>) {
        let stop_at = stop_after.map(|s| self.now + s);
        self.status_blink
            .start_in_step_with(&self.warning_blink, self.now, stop_at);
        self.pending.push(Notification::Blink {
            target: BlinkTarget::Status,
            directive: BlinkDirective::Start {
                interval_s: BLINK_INTERVAL_S,
                stop_at,
            },
        });
        if !self.status_blink.showing {
            self.pending
                .push(Notification::StatusVisible { visible: false });
        }
    }

    pub(crate) fn stop_status_blink(&mut self) {
        if self.status_blink.active {
            let was_showing = self.status_blink.showing;
            self.status_blink.stop();
            self.pending.push(Notification::Blink {
                target: BlinkTarget::Status,
                directive: BlinkDirective::Stop,
            });
            if !was_showing {
                self.pending.push(Notification::StatusVisible { visible: true });
            }
        }
    }

    pub(crate) fn start_warning_blink(&mut self, stop_after: f64) {
        let stop_at = Some(self.now + stop_after);
        let was_showing = self.warning_blink.showing;
        self.warning_blink.start(self.now, stop_at);
        self.pending.push(Notification::Blink {
            target: BlinkTarget::Warning,
            directive: BlinkDirective::Start {
                interval_s: BLINK_INTERVAL_S,
                stop_at,
            },
        });
        if !was_showing {
            self.pending
                .push(Notification::WarningVisible { visible: true });
        }
    }

    /// End the warning blink at its next toggle, clearing the warning.
    pub(crate) fn stop_warning_blink_soon(&mut self) {
        if self.warning_blink.active {
            self.warning_blink.stop_at = Some(self.now);
        }
    }

    pub(crate) fn stop_warning_blink(&mut self) {
        if self.warning_blink.active {
            let was_showing = self.warning_blink.showing;
            self.warning_blink.stop();
            self.pending.push(Notification::Blink {
                target: BlinkTarget::Warning,
                directive: BlinkDirective::Stop,
            });
            if !was_showing {
                self.pending
                    .push(Notification::WarningVisible { visible: true });
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn is_status_blinking(&self) -> bool {
        self.status_blink.active
    }

    #[cfg(test)]
    pub(crate) fn is_warning_blinking(&self) -> bool {
        self.warning_blink.active
    }

    /// Runs blink toggles and expires timed texts. `drive_through_pending` decides what
    /// an expiring warning falls back to.
    pub(crate) fn poll(&mut self, drive_through_pending: bool) {
        match self.status_blink.poll(self.now) {
            Some(BlinkStep::Toggled(visible)) => {
                self.pending.push(Notification::StatusVisible { visible })
            }
            Some(BlinkStep::Finished) => {
                self.pending.push(Notification::StatusVisible { visible: true });
                self.pending.push(Notification::Blink {
                    target: BlinkTarget::Status,
                    directive: BlinkDirective::Stop,
                });
            }
            None => {}
        }

        match self.warning_blink.poll(self.now) {
            Some(BlinkStep::Toggled(visible)) => {
                self.pending.push(Notification::WarningVisible { visible })
            }
            Some(BlinkStep::Finished) => {
                self.clear_warning();
                self.pending
                    .push(Notification::WarningVisible { visible: true });
                self.pending.push(Notification::Blink {
                    target: BlinkTarget::Warning,
                    directive: BlinkDirective::Stop,
                });
            }
            None => {}
        }

        if let Some(erase_at) = self.erase_warning_at {
            if erase_at < self.now {
                if drive_through_pending {
                    self.set_warning(super::DRIVE_THROUGH_TEXT, TextColour::Red);
                } else {
                    self.clear_warning();
                    self.hide_flag(Flag::BlackWhite);
                }
                self.erase_warning_at = None;
            }
        }

        if let Some(erase_at) = self.erase_chat_at {
            if erase_at < self.now {
                self.broadcast("");
                self.erase_chat_at = None;
            }
        }
    }
}
