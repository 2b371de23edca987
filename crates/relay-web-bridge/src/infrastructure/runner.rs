//! Wires the daemon link, the broadcast hub and the HTTP server together.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use relay_core::{DaemonLink, MessageSink};

use crate::application::BroadcastHub;
use crate::domain::BridgeConfig;
use crate::infrastructure::http_server::{run_server, AppState};

/// Runs the standalone bridge until `shutdown` is cancelled.
///
/// The persistent daemon link feeds every message it receives into the hub;
/// the HTTP server serves `/events` from that hub and answers the POST routes
/// with one-off connections.
///
/// # Errors
///
/// Fails if the HTTP address cannot be bound or the server stops with an I/O
/// error.
pub async fn run_bridge(config: BridgeConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
    if !config.link.socket_path.exists() {
        warn!(
            socket = %config.link.socket_path.display(),
            "daemon socket does not exist yet; will keep retrying"
        );
    }

    let listener = TcpListener::bind(config.http_bind_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {}", config.http_bind_addr))?;

    let hub = BroadcastHub::new();
    let sinks: Vec<Arc<dyn MessageSink>> = vec![Arc::new(hub.clone())];
    let (link, link_task) = DaemonLink::spawn(config.link.clone(), sinks, shutdown.clone());

    let state = AppState::new(hub, &config);
    let served = run_server(listener, state, shutdown.clone()).await;

    // The server may also stop on its own (I/O error); take the link down too.
    link.shutdown();
    if let Err(e) = link_task.await {
        warn!("daemon link task ended abnormally: {e}");
    }
    served.context("HTTP server failed")?;

    info!("bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::UnixListener;

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        // Arrange: occupy a port
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr: SocketAddr = taken.local_addr().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let mut config = BridgeConfig {
            http_bind_addr: addr,
            ..BridgeConfig::default()
        };
        config.link.socket_path = dir.path().join("daemon.sock");

        // Act
        let result = run_bridge(config, CancellationToken::new()).await;

        // Assert
        let err = result.unwrap_err();
        assert!(err.to_string().contains("failed to bind"));
    }

    #[tokio::test]
    async fn test_cancellation_stops_bridge() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BridgeConfig {
            http_bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..BridgeConfig::default()
        };
        config.link.socket_path = dir.path().join("daemon.sock");
        let shutdown = CancellationToken::new();

        let bridge = tokio::spawn(run_bridge(config, shutdown.clone()));
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), bridge).await;
        assert!(result.unwrap().unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_bridge_link_registers_as_log_listener() {
        // Arrange: a daemon socket for the bridge's persistent link
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.sock");
        let daemon = UnixListener::bind(&path).unwrap();
        let mut config = BridgeConfig {
            http_bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..BridgeConfig::default()
        };
        config.link.socket_path = path;
        let shutdown = CancellationToken::new();

        // Act
        let bridge = tokio::spawn(run_bridge(config, shutdown.clone()));
        let (stream, _) = daemon.accept().await.unwrap();
        let mut first = String::new();
        BufReader::new(stream).read_line(&mut first).await.unwrap();

        // Assert: never claims the native-host slot
        assert_eq!(first, "{\"command\":\"registerLogListener\"}\n");

        shutdown.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), bridge).await;
        assert!(result.unwrap().unwrap().is_ok());
    }
}
