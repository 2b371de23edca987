//! Connections to the daemon's control socket.
//!
//! Two independent paths reach the daemon:
//!
//! - [`DaemonLink`]: one persistent connection that registers itself after
//!   connecting, reconnects after failures, and pushes every daemon message to
//!   a set of [`MessageSink`]s.  Owned by a single task; producers talk to it
//!   through a cloneable [`DaemonLinkHandle`].
//! - [`one_off`]: anonymous connect / write one line / close cycles for
//!   callers that need no receive path (HTTP handlers).  No registration is
//!   sent on these connections.

pub mod daemon;
pub mod error;
pub mod one_off;
pub mod sink;

pub use daemon::{DaemonLink, DaemonLinkHandle, LinkConfig, LinkState, DEFAULT_SOCKET_PATH};
pub use error::LinkError;
pub use one_off::{request_one_off, send_one_off, try_send_one_off};
pub use sink::MessageSink;
