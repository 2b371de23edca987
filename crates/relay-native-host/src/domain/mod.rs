//! Domain layer for relay-native-host.
//!
//! - [`HostConfig`]: everything the host needs at runtime.
//! - [`HostMessage`]: a stdio-side message classified once by its routing
//!   key, so the rest of the host matches on a closed set of cases.

pub mod config;
pub mod host_message;

pub use config::HostConfig;
pub use host_message::HostMessage;
