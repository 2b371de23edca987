//! Downstream consumers of daemon-originated messages.

use tokio::sync::mpsc;
use tracing::debug;

use crate::protocol::Message;

/// Receives every message the daemon link decodes from the socket.
///
/// `deliver` is called from the link task itself, so implementations must not
/// block or await: queue the message and return.
#[cfg_attr(test, mockall::automock)]
pub trait MessageSink: Send + Sync {
    /// Accepts one daemon message.
    fn deliver(&self, message: &Message);
}

/// An unbounded channel is a sink: the receiving task drains it at its own
/// pace (the stdout writer, for example).
impl MessageSink for mpsc::UnboundedSender<Message> {
    fn deliver(&self, message: &Message) {
        if self.send(message.clone()).is_err() {
            debug!("sink receiver dropped; daemon message discarded");
        }
    }
}
