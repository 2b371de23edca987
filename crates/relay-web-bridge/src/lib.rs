//! relay-web-bridge library crate.
//!
//! Lets ordinary browser pages talk to the control daemon over HTTP: pages
//! POST commands, and subscribe to a Server-Sent-Events stream carrying every
//! message the daemon pushes.
//!
//! # Architecture
//!
//! ```text
//! Browser pages (HTTP POST / SSE)
//!         ↕
//! [relay-web-bridge]
//!   ├── domain/           BridgeConfig, reply bodies
//!   ├── application/      BroadcastHub (per-subscriber queues)
//!   └── infrastructure/
//!         ├── http_server/  axum routes, CORS, SSE
//!         └── runner/       link → hub → server wiring
//!         ↕
//! daemon (JSON lines over a Unix socket, via relay-core)
//! ```
//!
//! The native-messaging host embeds the same router when started with
//! `--http-bind`, so the hub and server are exposed as a library.

/// Domain layer: configuration and reply bodies (no I/O).
pub mod domain;

/// Application layer: subscriber fan-out.
pub mod application;

/// Infrastructure layer: HTTP server and runner.
pub mod infrastructure;
