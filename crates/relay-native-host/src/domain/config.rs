//! Host configuration.

use std::net::SocketAddr;
use std::time::Duration;

use relay_core::protocol::MAX_FRAME_BYTES;
use relay_core::LinkConfig;

/// All runtime configuration for the native-messaging host.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// The persistent, registered daemon link.
    pub link: LinkConfig,

    /// Largest stdio frame body accepted from the browser.
    pub max_frame_bytes: usize,

    /// Answer every browser message with a `{"status":..}` acknowledgement.
    pub acknowledge: bool,

    /// Also serve the HTTP/SSE bridge on this address.
    pub http_bind_addr: Option<SocketAddr>,

    /// Reply wait for `POST /command` when the HTTP bridge is enabled.
    pub request_timeout: Duration,
}

impl Default for HostConfig {
    /// | Field            | Default                  |
    /// |------------------|--------------------------|
    /// | link             | [`LinkConfig::default`]  |
    /// | max_frame_bytes  | 10 MiB                   |
    /// | acknowledge      | `false`                  |
    /// | http_bind_addr   | `None` (no HTTP)         |
    /// | request_timeout  | 2 seconds                |
    fn default() -> Self {
        Self {
            link: LinkConfig::default(),
            max_frame_bytes: MAX_FRAME_BYTES,
            acknowledge: false,
            http_bind_addr: None,
            request_timeout: Duration::from_secs(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = HostConfig::default();
        assert_eq!(cfg.max_frame_bytes, 10 * 1024 * 1024);
        assert!(!cfg.acknowledge);
        assert!(cfg.http_bind_addr.is_none());
        assert_eq!(cfg.link.registration["command"], "registerNativeHost");
    }
}
