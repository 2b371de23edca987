//! Link-level failures.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::protocol::FramingError;

/// Errors that can occur while talking to the daemon socket.
///
/// These never reach message producers on the persistent path (a failed
/// [`crate::DaemonLinkHandle::send`] is reported as `false`), but the one-off
/// request path returns them so an HTTP handler can pick a status code.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The socket path is missing or the daemon refused the connection.
    #[error("failed to connect to daemon socket {}: {source}", .path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The registration handshake could not be written.
    #[error("failed to register with daemon: {0}")]
    Register(#[source] std::io::Error),

    /// Writing a record failed mid-session.
    #[error("failed to write to daemon: {0}")]
    Write(#[source] std::io::Error),

    /// Reading from the socket failed mid-session.
    #[error("failed to read from daemon: {0}")]
    Read(#[source] std::io::Error),

    /// The daemon closed the connection before replying.
    #[error("daemon closed the connection")]
    Closed,

    /// The daemon did not reply in time.
    #[error("daemon did not reply within {0:?}")]
    Timeout(Duration),

    /// A record could not be encoded or the reply could not be decoded.
    #[error(transparent)]
    Framing(#[from] FramingError),
}
