//! Native-messaging stdio framing over async readers and writers.
//!
//! stdout has exactly one writer, [`run_stdout_writer`], fed by an unbounded
//! queue.  Daemon messages and acknowledgements share that queue, so two
//! frames never interleave.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use relay_core::protocol::frame::{decode_body, frame_body_len, LENGTH_PREFIX_SIZE};
use relay_core::protocol::{encode_frame, summarize, MAX_FRAME_BYTES};
use relay_core::{FramingError, Message, MessageSink};

use crate::application::{route, Route};
use crate::domain::HostMessage;

/// Reads length-prefixed frames from stdin (or any reader).
pub struct FrameReader<R> {
    reader: R,
    max_frame_bytes: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_limit(reader, MAX_FRAME_BYTES)
    }

    pub fn with_limit(reader: R, max_frame_bytes: usize) -> Self {
        Self {
            reader,
            max_frame_bytes,
        }
    }

    /// Reads the next frame.
    ///
    /// Returns `Ok(None)` when the stream ends cleanly before a frame starts
    /// (the browser closed the pipe).  A frame whose declared length is above
    /// the limit is skipped without buffering it and reported as
    /// [`FramingError::Oversize`]; the reader is then positioned at the next
    /// frame.
    ///
    /// # Errors
    ///
    /// Any [`FramingError`] other than `InsufficientData` and `Encode`.
    pub async fn read_frame(&mut self) -> Result<Option<Message>, FramingError> {
        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        let mut filled = 0;
        while filled < LENGTH_PREFIX_SIZE {
            let n = self.reader.read(&mut prefix[filled..]).await?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(FramingError::TruncatedPrefix { received: filled });
            }
            filled += n;
        }

        let body_len = match frame_body_len(prefix, self.max_frame_bytes) {
            Ok(len) => len,
            Err(oversize) => {
                self.skip(u64::from(u32::from_le_bytes(prefix))).await?;
                return Err(oversize);
            }
        };

        let mut body = vec![0u8; body_len];
        if let Err(e) = self.reader.read_exact(&mut body).await {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                return Err(FramingError::TruncatedBody { expected: body_len });
            }
            return Err(e.into());
        }

        decode_body(&body).map(Some)
    }

    /// Discards `len` bytes in bounded chunks.
    async fn skip(&mut self, len: u64) -> std::io::Result<()> {
        let skipped =
            tokio::io::copy(&mut (&mut self.reader).take(len), &mut tokio::io::sink()).await?;
        if skipped < len {
            debug!(skipped, len, "stream ended inside an oversize frame");
        }
        Ok(())
    }
}

/// Writes one frame and flushes it.
pub async fn write_frame<W>(writer: &mut W, message: &Message) -> Result<(), FramingError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(message)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Drains `outgoing` into `writer` until every sender is gone.
///
/// # Errors
///
/// Returns the I/O error if stdout can no longer be written (the browser has
/// gone away).  Unserializable messages are logged and skipped.
pub async fn run_stdout_writer<W>(
    mut writer: W,
    mut outgoing: mpsc::UnboundedReceiver<Message>,
) -> Result<(), FramingError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = outgoing.recv().await {
        match write_frame(&mut writer, &message).await {
            Ok(()) => debug!("→ browser: {}", summarize(&message)),
            Err(FramingError::Io(e)) => return Err(FramingError::Io(e)),
            Err(e) => warn!("dropping message for browser: {e}"),
        }
    }
    Ok(())
}

/// Sink that queues daemon messages for stdout.
pub struct BrowserSink {
    outgoing: mpsc::UnboundedSender<Message>,
}

impl BrowserSink {
    pub fn new(outgoing: mpsc::UnboundedSender<Message>) -> Self {
        Self { outgoing }
    }
}

impl MessageSink for BrowserSink {
    fn deliver(&self, message: &Message) {
        match route(HostMessage::from_daemon(message.clone())) {
            Route::ToBrowser(message) => {
                if self.outgoing.send(message).is_err() {
                    debug!("stdout writer gone; daemon message discarded");
                }
            }
            other => debug!("unexpected route for daemon message: {other:?}"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
