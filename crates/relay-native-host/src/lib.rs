//! relay-native-host library crate.
//!
//! The browser launches this host for its extension and talks to it over
//! stdin/stdout using native-messaging framing (a 4-byte little-endian length
//! then a UTF-8 JSON body).  The host relays:
//!
//! - browser → daemon: each frame is routed by its `command` / `url` /
//!   `action` key and written to the persistent, registered daemon link;
//! - daemon → browser: every line the daemon pushes becomes one stdout frame,
//!   unchanged.
//!
//! With an HTTP bind address the same daemon messages are also fanned out to
//! SSE subscribers through the web bridge's hub.
//!
//! # Layers
//!
//! ```text
//! domain/          HostConfig, HostMessage
//! application/     route(), Ack
//! infrastructure/  FrameReader, stdout writer, StdioPump, run_host
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;
