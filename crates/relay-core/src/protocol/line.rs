//! Newline-delimited JSON framing used on the daemon's control socket.
//!
//! Every record is one UTF-8 JSON object followed by a single `\n`.  A socket
//! is a *stream*: one `read()` may return half a record or several records at
//! once, so received bytes are accumulated in a [`LineBuffer`] and complete
//! lines are peeled off the front as they become available.

use crate::protocol::error::FramingError;
use crate::protocol::frame::{decode_body, MAX_FRAME_BYTES};
use crate::protocol::message::Message;

/// Record delimiter on the control socket.
pub const LINE_DELIMITER: u8 = b'\n';

/// Encodes `message` as one socket record: JSON followed by `\n`.
///
/// The caller writes the returned bytes with a single `write_all` so a record
/// is never split by another writer.
///
/// # Errors
///
/// Returns [`FramingError::Encode`] if the message cannot be serialized.
pub fn encode_line(message: &Message) -> Result<Vec<u8>, FramingError> {
    let mut line = serde_json::to_vec(message).map_err(FramingError::Encode)?;
    line.push(LINE_DELIMITER);
    Ok(line)
}

/// Partial-line buffer for one socket connection.
///
/// Bytes are kept raw until a delimiter arrives, so a multi-byte UTF-8
/// character split across two reads is reassembled before decoding.  An
/// unterminated line may grow to at most `max_line_bytes`; past that it is
/// discarded up to and including its eventual delimiter.
#[derive(Debug)]
pub struct LineBuffer {
    pending: Vec<u8>,
    /// Length of the unterminated line at the end of `pending`.
    tail_len: usize,
    /// Set while skipping the rest of an oversized line.
    discarding: bool,
    max_line_bytes: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::with_limit(MAX_FRAME_BYTES)
    }
}

impl LineBuffer {
    /// Creates an empty buffer accepting lines up to [`MAX_FRAME_BYTES`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty buffer with a caller-chosen line limit.
    pub fn with_limit(max_line_bytes: usize) -> Self {
        Self {
            pending: Vec::new(),
            tail_len: 0,
            discarding: false,
            max_line_bytes,
        }
    }

    /// Appends freshly received bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::Oversize`] when the unterminated line grows
    /// past the limit.  Its bytes are dropped, complete lines already
    /// buffered are kept, and the buffer resynchronizes on the next
    /// delimiter.
    pub fn extend(&mut self, bytes: &[u8]) -> Result<(), FramingError> {
        let mut bytes = bytes;
        if self.discarding {
            match bytes.iter().position(|&b| b == LINE_DELIMITER) {
                Some(end) => {
                    self.discarding = false;
                    bytes = &bytes[end + 1..];
                }
                None => return Ok(()),
            }
        }

        self.pending.extend_from_slice(bytes);
        self.tail_len = match bytes.iter().rposition(|&b| b == LINE_DELIMITER) {
            Some(last) => bytes.len() - last - 1,
            None => self.tail_len + bytes.len(),
        };

        if self.tail_len > self.max_line_bytes {
            let declared = self.tail_len;
            self.pending.truncate(self.pending.len() - self.tail_len);
            self.tail_len = 0;
            self.discarding = true;
            return Err(FramingError::Oversize {
                declared,
                max: self.max_line_bytes,
            });
        }
        Ok(())
    }

    /// Removes and decodes the next complete line.
    ///
    /// Returns `None` when no complete line is buffered.  Blank lines are
    /// skipped.  A line that fails to decode is consumed (delimiter included)
    /// and returned as `Some(Err(..))`; the bytes after it are untouched.
    pub fn next_message(&mut self) -> Option<Result<Message, FramingError>> {
        loop {
            let end = self.pending.iter().position(|&b| b == LINE_DELIMITER)?;
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            let content = &line[..end];

            if content.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Some(decode_body(content));
        }
    }

    /// Number of buffered bytes not yet resolved into a line.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Discards everything buffered.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.tail_len = 0;
        self.discarding = false;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
