//! Application layer for relay-web-bridge.
//!
//! Holds the [`BroadcastHub`] that fans daemon messages out to every
//! connected SSE client.  It knows nothing about HTTP: the infrastructure
//! layer turns each [`Subscription`] into an event stream.

pub mod hub;

pub use hub::{BroadcastHub, Subscription};
