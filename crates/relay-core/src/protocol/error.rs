//! Errors raised while encoding or decoding either wire framing.

use thiserror::Error;

/// Errors that can occur during frame or line encoding/decoding.
///
/// Every variant except [`FramingError::Encode`] describes bad input from a
/// peer: the offending message is logged and dropped, and the stream carries
/// on.  `Encode` means a caller tried to transmit something that is not valid
/// JSON, which is a bug upstream rather than a transport failure.
#[derive(Debug, Error)]
pub enum FramingError {
    /// The byte slice is shorter than one complete frame.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The stream ended part-way through the 4-byte length prefix.
    #[error("length prefix truncated: got {received} of 4 bytes")]
    TruncatedPrefix { received: usize },

    /// The stream ended before the declared body length was read.
    #[error("frame body truncated: expected {expected} bytes")]
    TruncatedBody { expected: usize },

    /// A frame's declared body, or an unterminated socket line, is larger
    /// than the configured maximum.
    #[error("frame of {declared} bytes exceeds the {max}-byte limit")]
    Oversize { declared: usize, max: usize },

    /// The body is not valid UTF-8.
    #[error("message is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The body is valid UTF-8 but not a JSON object.
    #[error("message is not a JSON object: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The message could not be serialized.
    #[error("message could not be serialized: {0}")]
    Encode(#[source] serde_json::Error),

    /// The underlying reader or writer failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
