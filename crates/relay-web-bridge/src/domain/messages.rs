//! JSON bodies exchanged with browser pages.
//!
//! Requests are plain [`Message`] objects; the bridge only looks at the one
//! key each endpoint cares about.  Replies use a small `"status"`-tagged
//! shape:
//!
//! ```json
//! {"status":"ok"}
//! {"status":"error","message":"No URL provided"}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use relay_core::protocol::message::{COMMAND_KEY, URL_KEY};
use relay_core::Message;

/// Error text when `POST /active-tab` carries no usable URL.
pub const NO_URL_PROVIDED: &str = "No URL provided";

/// Error text when `POST /command` carries no command name.
pub const NO_COMMAND_PROVIDED: &str = "No command provided";

/// Reply body for the bridge's own endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StatusReply {
    Ok,
    Error { message: String },
}

impl StatusReply {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// The URL a `POST /active-tab` body asks to relay.
///
/// Only a non-empty string counts; `null`, numbers and `""` are treated as
/// missing.
pub fn requested_url(body: &Message) -> Option<&str> {
    match body.get(URL_KEY) {
        Some(Value::String(url)) if !url.is_empty() => Some(url.as_str()),
        _ => None,
    }
}

/// The command name a `POST /command` body carries, if it is a non-empty
/// string.
pub fn requested_command(body: &Message) -> Option<&str> {
    match body.get(COMMAND_KEY) {
        Some(Value::String(name)) if !name.is_empty() => Some(name.as_str()),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
