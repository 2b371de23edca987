//! Domain layer for relay-web-bridge.
//!
//! Pure types with no I/O: the bridge configuration and the JSON bodies the
//! HTTP endpoints send back.

pub mod config;
pub mod messages;

pub use config::BridgeConfig;
pub use messages::{requested_command, requested_url, StatusReply};
