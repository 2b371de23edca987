//! relay-native-host — entry point.
//!
//! Launched by the browser for the extension; stdin/stdout carry the
//! native-messaging protocol, so logs go to stderr or to `--log-file`.
//!
//! # Usage
//!
//! ```text
//! relay-native-host [OPTIONS] [LAUNCHER_ARGS]...
//!
//! Options:
//!   --socket-path <PATH>       Daemon control socket
//!   --reconnect-ms <MS>        Reconnect backoff [default: 1000]
//!   --max-frame-bytes <BYTES>  Largest accepted stdin frame [default: 10485760]
//!   --ack                      Acknowledge every browser message on stdout
//!   --http-bind <IP>           Also serve the HTTP/SSE bridge on this address
//!   --http-port <PORT>         Port for --http-bind [default: 9223]
//!   --log-file <PATH>          Append logs here instead of stderr
//!   --config <PATH>            Optional TOML settings file
//! ```
//!
//! Browsers append their own arguments (the caller origin, and on some
//! platforms `--parent-window=<id>`); they are accepted and ignored.
//!
//! # Environment variable overrides
//!
//! | Variable             | Flag              |
//! |----------------------|-------------------|
//! | `RELAY_SOCKET_PATH`  | `--socket-path`   |
//! | `RELAY_RECONNECT_MS` | `--reconnect-ms`  |
//! | `RELAY_HTTP_BIND`    | `--http-bind`     |
//! | `RELAY_HTTP_PORT`    | `--http-port`     |
//! | `RELAY_LOG_FILE`     | `--log-file`      |
//! | `RELAY_CONFIG`       | `--config`        |

use std::fs::OpenOptions;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use relay_core::RelaySettings;
use relay_native_host::domain::HostConfig;
use relay_native_host::infrastructure::run_host;
use relay_web_bridge::domain::config::DEFAULT_HTTP_PORT;

/// How long to wait for blocking stdio threads once the host is done.
const RUNTIME_SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Native-messaging host relaying between the browser extension and the
/// control daemon.
#[derive(Debug, Parser)]
#[command(
    name = "relay-native-host",
    about = "Browser native-messaging host relaying between the extension and the control daemon",
    version
)]
struct Cli {
    /// Path of the daemon's Unix control socket.
    #[arg(long, env = "RELAY_SOCKET_PATH")]
    socket_path: Option<PathBuf>,

    /// Milliseconds to wait between daemon reconnect attempts.
    #[arg(long, env = "RELAY_RECONNECT_MS")]
    reconnect_ms: Option<u64>,

    /// Largest stdin frame body accepted, in bytes.
    #[arg(long)]
    max_frame_bytes: Option<usize>,

    /// Answer every browser message with a status acknowledgement.
    #[arg(long)]
    ack: bool,

    /// Serve the HTTP/SSE bridge on this address as well.
    #[arg(long, env = "RELAY_HTTP_BIND")]
    http_bind: Option<IpAddr>,

    /// Port for the HTTP/SSE bridge.
    #[arg(long, env = "RELAY_HTTP_PORT")]
    http_port: Option<u16>,

    /// Append logs to this file instead of stderr.
    #[arg(long, env = "RELAY_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Optional TOML settings file.
    #[arg(long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,

    /// Window handle some browsers pass on launch; unused.
    #[arg(long, hide = true)]
    parent_window: Option<String>,

    /// Arguments the browser appends (caller origin, manifest path, ...).
    #[arg(hide = true)]
    launcher_args: Vec<String>,
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

    /// Log destination: the flag, else the settings file, else stderr.
    fn log_file(&self, settings: &RelaySettings) -> Option<PathBuf> {
        self.log_file.clone().or_else(|| settings.logging.file.clone())
    }

    /// Merges flags over `settings` over the defaults.
    fn into_host_config(self, settings: &RelaySettings) -> HostConfig {
        let defaults = HostConfig::default();

        let mut link = settings.link_config();
        if let Some(path) = self.socket_path {
            link.socket_path = path;
        }
        if let Some(ms) = self.reconnect_ms {
            link.reconnect_backoff = Duration::from_millis(ms);
        }

        let http_bind_addr = self.http_bind.or(settings.http.bind_address).map(|ip| {
            let port = self
                .http_port
                .or(settings.http.port)
                .unwrap_or(DEFAULT_HTTP_PORT);
            SocketAddr::new(ip, port)
        });

        HostConfig {
            link,
            max_frame_bytes: self
                .max_frame_bytes
                .or(settings.stdio.max_frame_bytes)
                .unwrap_or(defaults.max_frame_bytes),
            acknowledge: self.ack || settings.stdio.acknowledge.unwrap_or(defaults.acknowledge),
            http_bind_addr,
            request_timeout: settings.request_timeout().unwrap_or(defaults.request_timeout),
        }
    }
}

/// Installs the global subscriber.  Never writes to stdout.
fn init_logging(level: &str, log_file: Option<PathBuf>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings()?;
    let level = settings.logging.level.clone().unwrap_or_else(|| "info".to_string());
    init_logging(&level, cli.log_file(&settings))?;

    if !cli.launcher_args.is_empty() {
        debug!(args = ?cli.launcher_args, "launched by browser");
    }
    let config = cli.into_host_config(&settings);

    // stdin is read on a blocking thread that cannot be interrupted, so the
    // runtime is shut down with a deadline instead of waiting for it.
    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let result = runtime.block_on(run(config));
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_GRACE);
    result
}

async fn run(config: HostConfig) -> anyhow::Result<()> {
    info!(
        socket = %config.link.socket_path.display(),
        ack = config.acknowledge,
        http = ?config.http_bind_addr,
        "native host starting"
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C — shutting down");
                signal_token.cancel();
            }
            Err(e) => tracing::error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    run_host(config, tokio::io::stdin(), tokio::io::stdout(), shutdown).await
}

// ── Tests ─────────────────────────────────────────────────────────────────────
