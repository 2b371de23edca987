//! Anonymous, single-record exchanges with the daemon.
//!
//! Each call opens its own connection, writes exactly one line and closes.
//! No registration record is sent, so the daemon never mistakes these
//! connections for the native host.

use std::path::Path;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::{debug, warn};

use crate::link::error::LinkError;
use crate::protocol::message::summarize;
use crate::protocol::{encode_line, LineBuffer, Message};

/// Connects, writes one line and closes.  Failures are logged and reported as
/// `false`.
pub async fn send_one_off(socket_path: &Path, message: &Message) -> bool {
    match try_send_one_off(socket_path, message).await {
        Ok(()) => true,
        Err(e) => {
            warn!("one-off send failed: {e}");
            false
        }
    }
}

/// Like [`send_one_off`] but returns the reason for a failure.
pub async fn try_send_one_off(socket_path: &Path, message: &Message) -> Result<(), LinkError> {
    let line = encode_line(message)?;
    let mut stream = connect(socket_path).await?;

    stream.write_all(&line).await.map_err(LinkError::Write)?;
    stream.shutdown().await.map_err(LinkError::Write)?;

    debug!("→ daemon (one-off): {}", summarize(message));
    Ok(())
}

/// Writes one line, then waits up to `timeout` for the daemon's first reply
/// line on the same connection.
///
/// # Errors
///
/// - [`LinkError::Connect`] / [`LinkError::Write`] if the request could not be
///   delivered.
/// - [`LinkError::Closed`] if the daemon hung up without replying.
/// - [`LinkError::Timeout`] if no complete reply arrived in time.
/// - [`LinkError::Framing`] if the reply line is not a JSON object.
pub async fn request_one_off(
    socket_path: &Path,
    message: &Message,
    timeout: Duration,
) -> Result<Message, LinkError> {
    tokio::time::timeout(timeout, exchange(socket_path, message))
        .await
        .map_err(|_| LinkError::Timeout(timeout))?
}

async fn exchange(socket_path: &Path, message: &Message) -> Result<Message, LinkError> {
    let line = encode_line(message)?;
    let mut stream = connect(socket_path).await?;
    stream.write_all(&line).await.map_err(LinkError::Write)?;
    debug!("→ daemon (request): {}", summarize(message));

    let mut buffer = LineBuffer::new();
    let mut chunk = [0u8; 4096];
    loop {
        if let Some(reply) = buffer.next_message() {
            let reply = reply?;
            debug!("← daemon (reply): {}", summarize(&reply));
            return Ok(reply);
        }
        let n = stream.read(&mut chunk).await.map_err(LinkError::Read)?;
        if n == 0 {
            return Err(LinkError::Closed);
        }
        buffer.extend(&chunk[..n])?;
    }
}

async fn connect(socket_path: &Path) -> Result<UnixStream, LinkError> {
    UnixStream::connect(socket_path)
        .await
        .map_err(|source| LinkError::Connect {
            path: socket_path.to_path_buf(),
            source,
        })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
