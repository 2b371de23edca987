//! relay-web-bridge — entry point.
//!
//! Serves the HTTP/SSE bridge between browser pages and the control daemon.
//!
//! # Usage
//!
//! ```text
//! relay-web-bridge [OPTIONS]
//!
//! Options:
//!   --http-bind <IP>           Listener address [default: 127.0.0.1]
//!   --http-port <PORT>         Listener port [default: 9223]
//!   --socket-path <PATH>       Daemon control socket
//!   --reconnect-ms <MS>        Reconnect backoff [default: 1000]
//!   --request-timeout-ms <MS>  Reply wait for POST /command [default: 2000]
//!   --config <PATH>            Optional TOML settings file
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable             | Flag              |
//! |----------------------|-------------------|
//! | `RELAY_HTTP_BIND`    | `--http-bind`     |
//! | `RELAY_HTTP_PORT`    | `--http-port`     |
//! | `RELAY_SOCKET_PATH`  | `--socket-path`   |
//! | `RELAY_RECONNECT_MS` | `--reconnect-ms`  |
//! | `RELAY_CONFIG`       | `--config`        |
//!
//! A flag or variable wins over the settings file, which wins over the
//! built-in defaults.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use relay_core::RelaySettings;
use relay_web_bridge::domain::config::DEFAULT_HTTP_PORT;
use relay_web_bridge::domain::BridgeConfig;
use relay_web_bridge::infrastructure::run_bridge;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// HTTP and Server-Sent-Events bridge to the control daemon.
#[derive(Debug, Parser)]
#[command(
    name = "relay-web-bridge",
    about = "HTTP and Server-Sent-Events bridge between browser pages and the control daemon",
    version
)]
struct Cli {
    /// IP address the HTTP server binds to.
    #[arg(long, env = "RELAY_HTTP_BIND")]
    http_bind: Option<IpAddr>,

    /// TCP port the HTTP server listens on.
    #[arg(long, env = "RELAY_HTTP_PORT")]
    http_port: Option<u16>,

    /// Path of the daemon's Unix control socket.
    #[arg(long, env = "RELAY_SOCKET_PATH")]
    socket_path: Option<PathBuf>,

    /// Milliseconds to wait between daemon reconnect attempts.
    #[arg(long, env = "RELAY_RECONNECT_MS")]
    reconnect_ms: Option<u64>,

    /// Milliseconds `POST /command` waits for the daemon's reply.
    #[arg(long)]
    request_timeout_ms: Option<u64>,

    /// Optional TOML settings file.
    #[arg(long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Loads the settings file named by `--config`, or empty settings.
    fn settings(&self) -> anyhow::Result<RelaySettings> {
        match &self.config {
            Some(path) => RelaySettings::load(path)
                .with_context(|| format!("failed to load settings from {}", path.display())),
            None => Ok(RelaySettings::default()),
        }
    }

    /// Merges flags over `settings` over the defaults.
    fn into_bridge_config(self, settings: &RelaySettings) -> BridgeConfig {
        let defaults = BridgeConfig::default();

        let ip = self
            .http_bind
            .or(settings.http.bind_address)
            .unwrap_or(defaults.http_bind_addr.ip());
        let port = self
            .http_port
            .or(settings.http.port)
            .unwrap_or(DEFAULT_HTTP_PORT);

        let mut link = settings.link_config_over(defaults.link.clone());
        if let Some(path) = self.socket_path {
            link.socket_path = path;
        }
        if let Some(ms) = self.reconnect_ms {
            link.reconnect_backoff = Duration::from_millis(ms);
        }

        let request_timeout = self
            .request_timeout_ms
            .map(Duration::from_millis)
            .or(settings.request_timeout())
            .unwrap_or(defaults.request_timeout);

        BridgeConfig {
            http_bind_addr: SocketAddr::new(ip, port),
            link,
            request_timeout,
        }
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings()?;

    // `RUST_LOG` wins; otherwise the settings file level, otherwise `info`.
    let fallback_level = settings.logging.level.clone().unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_level)),
        )
        .init();

    let config = cli.into_bridge_config(&settings);
    info!(
        "relay web bridge starting — http={}, socket={}",
        config.http_bind_addr,
        config.link.socket_path.display()
    );

    // ── Graceful shutdown ─────────────────────────────────────────────────────
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C — initiating graceful shutdown");
                signal_token.cancel();
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_bridge(config, shutdown).await?;

    info!("relay web bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::link::DEFAULT_SOCKET_PATH;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["relay-web-bridge"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_defaults_produce_loopback_9223() {
        // Arrange: no arguments, no settings file
        let cli = parse(&[]);

        // Act
        let config = cli.into_bridge_config(&RelaySettings::default());

        // Assert
        assert_eq!(config.http_bind_addr.to_string(), "127.0.0.1:9223");
        assert_eq!(config.link.socket_path, PathBuf::from(DEFAULT_SOCKET_PATH));
        assert_eq!(config.request_timeout, Duration::from_secs(2));
        assert_eq!(config.link.registration["command"], "registerLogListener");
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = parse(&[
            "--http-bind",
            "0.0.0.0",
            "--http-port",
            "8080",
            "--socket-path",
            "/tmp/d.sock",
            "--reconnect-ms",
            "250",
            "--request-timeout-ms",
            "900",
        ]);

        let config = cli.into_bridge_config(&RelaySettings::default());

        assert_eq!(config.http_bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.link.socket_path, PathBuf::from("/tmp/d.sock"));
        assert_eq!(config.link.reconnect_backoff, Duration::from_millis(250));
        assert_eq!(config.request_timeout, Duration::from_millis(900));
    }

    #[test]
    fn test_settings_file_fills_unset_flags() {
        // Arrange: file sets port and socket; flag sets port too
        let settings = RelaySettings::from_toml_str(
            "[http]\nport = 7000\n[daemon]\nsocket_path = \"/tmp/file.sock\"\nrequest_timeout_ms = 300\n",
        )
        .unwrap();
        let cli = parse(&["--http-port", "7100"]);

        // Act
        let config = cli.into_bridge_config(&settings);

        // Assert: flag wins for the port, file supplies the rest
        assert_eq!(config.http_bind_addr.port(), 7100);
        assert_eq!(config.link.socket_path, PathBuf::from("/tmp/file.sock"));
        assert_eq!(config.request_timeout, Duration::from_millis(300));
    }

    #[test]
    fn test_invalid_bind_address_is_rejected_by_parser() {
        let result = Cli::try_parse_from(["relay-web-bridge", "--http-bind", "not.an.ip"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_settings_file_is_an_error() {
        let cli = parse(&["--config", "/nonexistent/relay.toml"]);
        let err = cli.settings().unwrap_err();
        assert!(err.to_string().contains("failed to load settings"));
    }
}
