//! Routing decisions for messages crossing the stdio boundary.
//!
//! | Input                         | Route                                               |
//! |-------------------------------|-----------------------------------------------------|
//! | `Command(m)`                  | `ToDaemon(m)` unchanged                             |
//! | `Url(u)`                      | `ToDaemon({"command":"setActiveTabUrl","url":u})`   |
//! | `Action("focusAck")`          | `ToDaemon({"command":"focusAck"})`                  |
//! | `Action(other)`               | `Drop("unknown action ..")`                         |
//! | `Unrecognized(_)`             | `Drop("unsupported message ..")`                    |
//! | `DaemonEvent(m)`              | `ToBrowser(m)` unchanged                            |
//!
//! Unrecognized browser messages are never forwarded verbatim.

use serde_json::Value;

use relay_core::protocol::message::{focus_ack, set_active_tab_url, FOCUS_ACK, URL_KEY};
use relay_core::Message;

use crate::domain::HostMessage;

/// Where a message goes next.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Write to the daemon link.
    ToDaemon(Message),
    /// Write to stdout as one frame.
    ToBrowser(Message),
    /// Log and discard.
    Drop(String),
}

/// Decides the route for `message`.
pub fn route(message: HostMessage) -> Route {
    match message {
        HostMessage::Command(message) => Route::ToDaemon(message),
        HostMessage::Url(url) => Route::ToDaemon(set_active_tab_url(url)),
        HostMessage::Action(action) if action == FOCUS_ACK => Route::ToDaemon(focus_ack()),
        HostMessage::Action(action) => Route::Drop(format!("unknown action from browser: {action}")),
        HostMessage::DaemonEvent(message) => Route::ToBrowser(message),
        HostMessage::Unrecognized(_) => {
            Route::Drop("unsupported message from browser: no command, url or action".to_string())
        }
    }
}

/// Acknowledgement written back to the extension when `--ack` is on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    /// The daemon link accepted the message.
    Sent { url: Option<String> },
    /// The daemon was unreachable or the write failed.
    Failed { url: Option<String> },
    /// The message could not be routed.
    Rejected { reason: String },
}

impl Ack {
    /// Ack for a message handed to the daemon link; `sent` is the link's
    /// result.  The relayed URL, if any, is echoed back.
    pub fn for_forwarded(forwarded: &Message, sent: bool) -> Self {
        let url = match forwarded.get(URL_KEY) {
            Some(Value::String(url)) => Some(url.clone()),
            _ => None,
        };
        if sent {
            Self::Sent { url }
        } else {
            Self::Failed { url }
        }
    }

    /// `{"status":"ok"|"error"}` plus `url` or `message`.
    pub fn into_message(self) -> Message {
        let mut ack = Message::new();
        let (status, url, reason) = match self {
            Self::Sent { url } => ("ok", url, None),
            Self::Failed { url } => ("error", url, None),
            Self::Rejected { reason } => ("error", None, Some(reason)),
        };
        ack.insert("status".to_string(), Value::String(status.to_string()));
        if let Some(url) = url {
            ack.insert(URL_KEY.to_string(), Value::String(url));
        }
        if let Some(reason) = reason {
            ack.insert("message".to_string(), Value::String(reason));
        }
        ack
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Message {
        match value {
            Value::Object(map) => map,
            other => panic!("fixture must be an object, got {other}"),
        }
    }

    fn browser(value: Value) -> Route {
        route(HostMessage::from_browser(object(value)))
    }

    #[test]
    fn test_command_is_forwarded_unchanged() {
        let msg = json!({"command": "openApp", "name": "terminal", "seq": 4});
        assert_eq!(browser(msg.clone()), Route::ToDaemon(object(msg)));
    }

    #[test]
    fn test_url_is_wrapped_as_set_active_tab_url() {
        // Arrange
        let msg = json!({"url": "https://example.com", "title": "Example"});

        // Act
        let routed = browser(msg);

        // Assert: extra fields are not carried over
        assert_eq!(
            routed,
            Route::ToDaemon(object(
                json!({"command": "setActiveTabUrl", "url": "https://example.com"})
            ))
        );
    }

    #[test]
    fn test_focus_ack_action_maps_to_command() {
        assert_eq!(
            browser(json!({"action": "focusAck", "seq": 9})),
            Route::ToDaemon(object(json!({"command": "focusAck"})))
        );
    }

    #[test]
    fn test_unknown_action_is_dropped() {
        let Route::Drop(reason) = browser(json!({"action": "dance"})) else {
            panic!("unknown action must be dropped");
        };
        assert!(reason.contains("dance"));
    }

    #[test]
    fn test_unrecognized_is_dropped_not_forwarded() {
        assert!(matches!(browser(json!({"foo": 1})), Route::Drop(_)));
    }

    #[test]
    fn test_daemon_event_goes_to_browser_unchanged() {
        let msg = object(json!({"seq": 5, "action": "ping"}));
        assert_eq!(
            route(HostMessage::from_daemon(msg.clone())),
            Route::ToBrowser(msg)
        );
    }

    #[test]
    fn test_ack_for_sent_url_echoes_url() {
        let forwarded = set_active_tab_url("https://example.com");
        let ack = Ack::for_forwarded(&forwarded, true).into_message();
        assert_eq!(
            Value::Object(ack),
            json!({"status": "ok", "url": "https://example.com"})
        );
    }

    #[test]
    fn test_ack_for_failed_command_has_no_url() {
        let ack = Ack::for_forwarded(&focus_ack(), false).into_message();
        assert_eq!(Value::Object(ack), json!({"status": "error"}));
    }

    #[test]
    fn test_ack_for_rejected_explains() {
        let ack = Ack::Rejected {
            reason: "unknown action from browser: dance".to_string(),
        }
        .into_message();
        assert_eq!(ack["status"], "error");
        assert_eq!(ack["message"], "unknown action from browser: dance");
    }
}
