//! Bridge configuration types.
//!
//! [`BridgeConfig`] is the single source of truth for the bridge's runtime
//! settings.  `main.rs` fills it from CLI flags, environment variables and the
//! optional settings file; tests build it directly.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use relay_core::protocol::message::command;
use relay_core::LinkConfig;

/// Default HTTP listener port.
pub const DEFAULT_HTTP_PORT: u16 = 9223;

/// Registration the bridge's persistent link sends.  The daemon tracks a
/// single native host, so the bridge registers as a log listener and leaves
/// that slot to the extension's host.
pub const BRIDGE_REGISTRATION_COMMAND: &str = "registerLogListener";

/// Default wait for a daemon reply on `POST /command`.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// All runtime configuration for the HTTP/SSE bridge.
///
/// # Example
///
/// ```rust
/// use relay_web_bridge::domain::BridgeConfig;
///
/// let cfg = BridgeConfig::default();
/// assert_eq!(cfg.http_bind_addr.port(), 9223);
/// ```
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Address the HTTP server listens on.  Loopback by default: the bridge
    /// has no authentication of its own.
    pub http_bind_addr: SocketAddr,

    /// The persistent daemon link feeding `/events`.  Its socket path is also
    /// used for one-off sends.  Registers with
    /// [`BRIDGE_REGISTRATION_COMMAND`] by default.
    pub link: LinkConfig,

    /// How long `POST /command` waits for the daemon's reply line.
    pub request_timeout: Duration,
}

impl Default for BridgeConfig {
    /// | Field           | Default                                        |
    /// |-----------------|------------------------------------------------|
    /// | http_bind_addr  | `127.0.0.1:9223`                               |
    /// | link            | default socket, `registerLogListener`          |
    /// | request_timeout | 2 seconds                                      |
    fn default() -> Self {
        Self {
            http_bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_HTTP_PORT)),
            link: LinkConfig {
                registration: command(BRIDGE_REGISTRATION_COMMAND),
                ..LinkConfig::default()
            },
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::link::DEFAULT_SOCKET_PATH;
    use std::path::PathBuf;

    #[test]
    fn test_default_binds_loopback_9223() {
        // Arrange / Act
        let cfg = BridgeConfig::default();
        // Assert
        assert_eq!(cfg.http_bind_addr.to_string(), "127.0.0.1:9223");
    }

    #[test]
    fn test_default_uses_daemon_socket_path() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.link.socket_path, PathBuf::from(DEFAULT_SOCKET_PATH));
    }

    #[test]
    fn test_default_registers_as_log_listener_not_native_host() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.link.registration["command"], "registerLogListener");
        assert_eq!(cfg.link.registration.len(), 1);
    }

    #[test]
    fn test_default_request_timeout_is_2s() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.request_timeout, Duration::from_secs(2));
    }
}
