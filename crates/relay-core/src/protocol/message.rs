//! The relay's message model.
//!
//! A [`Message`] is an opaque JSON object.  The relay never validates a schema:
//! it looks at a handful of routing keys (`command`, `url`, `action`, `seq`)
//! when deciding where a message goes or what to write in a log line, and
//! otherwise forwards the whole object untouched.

use std::fmt;

use serde_json::{Map, Value};

/// An opaque mapping of string keys to JSON values.
pub type Message = Map<String, Value>;

/// Key naming the daemon command a message carries.
pub const COMMAND_KEY: &str = "command";
/// Key carrying a tab URL reported by the browser.
pub const URL_KEY: &str = "url";
/// Key naming an extension-side action.
pub const ACTION_KEY: &str = "action";
/// Optional sequence number, used only in log lines.
pub const SEQ_KEY: &str = "seq";

/// Command a persistent link sends right after connecting.
pub const REGISTER_NATIVE_HOST: &str = "registerNativeHost";
/// Command reporting the browser's active tab URL.
pub const SET_ACTIVE_TAB_URL: &str = "setActiveTabUrl";
/// Command acknowledging a focus request.
pub const FOCUS_ACK: &str = "focusAck";

/// Builds `{"command": <name>}`.
pub fn command(name: &str) -> Message {
    let mut message = Map::new();
    message.insert(COMMAND_KEY.to_string(), Value::String(name.to_string()));
    message
}

/// The default registration handshake, `{"command":"registerNativeHost"}`.
pub fn registration() -> Message {
    command(REGISTER_NATIVE_HOST)
}

/// Builds `{"command":"setActiveTabUrl","url":<url>}`.
pub fn set_active_tab_url(url: impl Into<String>) -> Message {
    let mut message = command(SET_ACTIVE_TAB_URL);
    message.insert(URL_KEY.to_string(), Value::String(url.into()));
    message
}

/// Builds `{"command":"focusAck"}`.
pub fn focus_ack() -> Message {
    command(FOCUS_ACK)
}

/// Returns `true` if `message` names a command.
pub fn has_command(message: &Message) -> bool {
    message.contains_key(COMMAND_KEY)
}

/// Borrowed view of a message that renders only its routing keys.
///
/// Used in log lines so payloads (page URLs, clipboard text, ...) never end up
/// in the log.
pub struct Summary<'a>(&'a Message);

/// Wraps `message` for logging: `"<action|command|unknown> (seq: <seq|N/A>)"`.
pub fn summarize(message: &Message) -> Summary<'_> {
    Summary(message)
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = self
            .0
            .get(ACTION_KEY)
            .or_else(|| self.0.get(COMMAND_KEY));
        match kind {
            Some(Value::String(name)) => f.write_str(name)?,
            Some(other) => write!(f, "{other}")?,
            None => f.write_str("unknown")?,
        }
        match self.0.get(SEQ_KEY) {
            Some(seq) => write!(f, " (seq: {seq})"),
            None => f.write_str(" (seq: N/A)"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
