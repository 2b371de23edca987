//! Infrastructure layer for relay-web-bridge.
//!
//! All I/O lives here: the axum router and its handlers, the TCP listener,
//! and the runner that wires the daemon link to the broadcast hub.

pub mod http_server;
pub mod runner;

pub use http_server::{router, run_server, AppState};
pub use runner::run_bridge;
