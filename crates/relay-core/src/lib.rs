//! # relay-core
//!
//! Shared library for the daemon relay: the message model, the two wire
//! framings, and the reconnecting link to the control daemon.
//!
//! This crate is used by both the native-messaging host and the HTTP/SSE web
//! bridge.
//!
//! # Architecture overview
//!
//! Three transports are kept in sync by the relay:
//!
//! ```text
//! browser extension ──(stdio, 4-byte LE length + JSON)──┐
//!                                                       ├── relay ──(Unix socket, JSON lines)── daemon
//! browser pages ──(HTTP POST / SSE)─────────────────────┘
//! ```
//!
//! - **`protocol`** – How bytes travel on each transport.  A [`Message`] is an
//!   opaque JSON object; [`protocol::frame`] implements the length-prefixed
//!   stdio framing and [`protocol::line`] the newline-delimited socket
//!   framing.  Pure functions, no I/O.
//!
//! - **`link`** – The persistent, registered connection to the daemon's control
//!   socket ([`DaemonLink`]), the one-shot anonymous send/request paths, and
//!   the [`MessageSink`] seam through which daemon messages fan out.
//!
//! - **`config`** – The optional TOML settings file shared by both binaries.

pub mod config;
pub mod link;
pub mod protocol;

pub use config::{ConfigError, RelaySettings};
pub use link::{DaemonLink, DaemonLinkHandle, LinkConfig, LinkError, LinkState, MessageSink};
pub use protocol::{FramingError, Message};
