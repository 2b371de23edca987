//! Protocol module containing the message model and both wire codecs.

pub mod error;
pub mod frame;
pub mod line;
pub mod message;

pub use error::FramingError;
pub use frame::{decode_frame, encode_frame, MAX_FRAME_BYTES};
pub use line::{encode_line, LineBuffer};
pub use message::{summarize, Message};
