//! Application layer for relay-native-host: where each message goes, and what
//! the extension is told about it.

pub mod router;

pub use router::{route, Ack, Route};
