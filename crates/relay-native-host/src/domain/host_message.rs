//! Classification of messages crossing the stdio boundary.

use serde_json::Value;

use relay_core::protocol::message::{has_command, ACTION_KEY, URL_KEY};
use relay_core::Message;

/// A message seen by the host, classified by its routing key.
///
/// Browser messages are classified in priority order: a `command` key wins
/// over `url`, which wins over `action`.
#[derive(Debug, Clone, PartialEq)]
pub enum HostMessage {
    /// Browser message naming a daemon command; forwarded as-is.
    Command(Message),
    /// Browser report of the active tab URL.
    Url(String),
    /// Extension-side action, e.g. `focusAck`.
    Action(String),
    /// Message pushed by the daemon, bound for the browser unchanged.
    DaemonEvent(Message),
    /// Browser message with no usable routing key.
    Unrecognized(Message),
}

impl HostMessage {
    /// Classifies a message read from stdin.
    ///
    /// A `url` or `action` whose value is not a string cannot be routed and
    /// yields [`HostMessage::Unrecognized`].
    pub fn from_browser(message: Message) -> Self {
        if has_command(&message) {
            return Self::Command(message);
        }
        if let Some(url) = message.get(URL_KEY) {
            return match url {
                Value::String(url) => Self::Url(url.clone()),
                _ => Self::Unrecognized(message),
            };
        }
        match message.get(ACTION_KEY) {
            Some(Value::String(action)) => Self::Action(action.clone()),
            _ => Self::Unrecognized(message),
        }
    }

    /// Wraps a message received from the daemon.
    pub fn from_daemon(message: Message) -> Self {
        Self::DaemonEvent(message)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
