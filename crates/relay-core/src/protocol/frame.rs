//! Length-prefixed framing used by the browser's native-messaging stdio pipe.
//!
//! Wire format:
//! ```text
//! [body_len:4][body:N]
//! ```
//! `body_len` is an unsigned 32-bit **little-endian** integer; `body` is the
//! UTF-8 encoded JSON object.  There is no delimiter and no padding.
//!
//! The functions here are pure: they work on byte slices so they can be used
//! both by the async stdio reader and in tests without any I/O.

use crate::protocol::error::FramingError;
use crate::protocol::message::Message;

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Largest body accepted from the browser (10 MiB).
pub const MAX_FRAME_BYTES: usize = 10 * 1024 * 1024;

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes `message` as one complete frame (prefix + body).
///
/// # Errors
///
/// Returns [`FramingError::Encode`] if the message cannot be serialized and
/// [`FramingError::Oversize`] if the body does not fit a 32-bit length.
///
/// # Examples
///
/// ```rust
/// use relay_core::protocol::{decode_frame, encode_frame, message::focus_ack};
///
/// let bytes = encode_frame(&focus_ack()).unwrap();
/// let (decoded, consumed) = decode_frame(&bytes).unwrap();
/// assert_eq!(decoded, focus_ack());
/// assert_eq!(consumed, bytes.len());
/// ```
pub fn encode_frame(message: &Message) -> Result<Vec<u8>, FramingError> {
    let body = serde_json::to_vec(message).map_err(FramingError::Encode)?;
    let body_len = u32::try_from(body.len()).map_err(|_| FramingError::Oversize {
        declared: body.len(),
        max: u32::MAX as usize,
    })?;

    let mut buf = Vec::with_capacity(LENGTH_PREFIX_SIZE + body.len());
    buf.extend_from_slice(&body_len.to_le_bytes());
    buf.extend_from_slice(&body);
    Ok(buf)
}

/// Interprets a length prefix, rejecting bodies larger than `max`.
///
/// # Errors
///
/// Returns [`FramingError::Oversize`] when the declared length exceeds `max`.
pub fn frame_body_len(prefix: [u8; LENGTH_PREFIX_SIZE], max: usize) -> Result<usize, FramingError> {
    let declared = u32::from_le_bytes(prefix) as usize;
    if declared > max {
        return Err(FramingError::Oversize { declared, max });
    }
    Ok(declared)
}

/// Decodes a frame body (without its prefix) into a [`Message`].
///
/// # Errors
///
/// Returns [`FramingError::InvalidUtf8`] or [`FramingError::InvalidJson`].
pub fn decode_body(body: &[u8]) -> Result<Message, FramingError> {
    let text = std::str::from_utf8(body)?;
    serde_json::from_str(text).map_err(FramingError::InvalidJson)
}

/// Decodes one frame from the beginning of `bytes` using [`MAX_FRAME_BYTES`].
///
/// Returns the message and the number of bytes consumed (prefix + body).
///
/// # Errors
///
/// Returns [`FramingError::InsufficientData`] when `bytes` does not yet hold a
/// complete frame, or any body decoding error.
pub fn decode_frame(bytes: &[u8]) -> Result<(Message, usize), FramingError> {
    decode_frame_with_limit(bytes, MAX_FRAME_BYTES)
}

/// Like [`decode_frame`] but with a caller-chosen maximum body size.
///
/// # Errors
///
/// See [`decode_frame`]; additionally [`FramingError::Oversize`].
pub fn decode_frame_with_limit(bytes: &[u8], max: usize) -> Result<(Message, usize), FramingError> {
    if bytes.len() < LENGTH_PREFIX_SIZE {
        return Err(FramingError::InsufficientData {
            needed: LENGTH_PREFIX_SIZE,
            available: bytes.len(),
        });
    }

    let prefix = [bytes[0], bytes[1], bytes[2], bytes[3]];
    let body_len = frame_body_len(prefix, max)?;

    let total_needed = LENGTH_PREFIX_SIZE + body_len;
    if bytes.len() < total_needed {
        return Err(FramingError::InsufficientData {
            needed: total_needed,
            available: bytes.len(),
        });
    }

    let message = decode_body(&bytes[LENGTH_PREFIX_SIZE..total_needed])?;
    Ok((message, total_needed))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
