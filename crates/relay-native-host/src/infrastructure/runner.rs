//! Wires stdio, the daemon link and the optional HTTP bridge together.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use relay_core::{DaemonLink, MessageSink};
use relay_web_bridge::application::BroadcastHub;
use relay_web_bridge::infrastructure::{run_server, AppState};

use crate::domain::HostConfig;
use crate::infrastructure::pump::StdioPump;
use crate::infrastructure::stdio::{run_stdout_writer, BrowserSink, FrameReader};

/// Runs the host over `stdin`/`stdout` until stdin ends or `shutdown` is
/// cancelled.
///
/// ```text
/// stdin ─▶ StdioPump ─▶ DaemonLink ─▶ daemon
/// stdout ◀─ writer ◀─ BrowserSink ◀─┤
///                  BroadcastHub ◀───┘  (only with an HTTP bind address)
/// ```
///
/// # Errors
///
/// Fails if the HTTP address cannot be bound.  Stdio and daemon failures are
/// logged, never returned.
pub async fn run_host<R, W>(
    config: HostConfig,
    stdin: R,
    stdout: W,
    shutdown: CancellationToken,
) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
    let mut sinks: Vec<Arc<dyn MessageSink>> = vec![Arc::new(BrowserSink::new(outgoing_tx.clone()))];

    // ── Optional HTTP/SSE bridge ──────────────────────────────────────────────
    let server = match config.http_bind_addr {
        Some(addr) => {
            let listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind HTTP listener on {addr}"))?;
            let hub = BroadcastHub::new();
            sinks.push(Arc::new(hub.clone()));
            let state = AppState {
                hub,
                socket_path: Arc::new(config.link.socket_path.clone()),
                request_timeout: config.request_timeout,
            };
            Some(tokio::spawn(run_server(listener, state, shutdown.clone())))
        }
        None => None,
    };

    // ── Daemon link and stdout writer ─────────────────────────────────────────
    let (link, link_task) = DaemonLink::spawn(config.link.clone(), sinks, shutdown.clone());

    let writer_shutdown = shutdown.clone();
    let writer = tokio::spawn(async move {
        if let Err(e) = run_stdout_writer(stdout, outgoing_rx).await {
            warn!("stdout closed: {e}");
            writer_shutdown.cancel();
        }
    });

    // ── Outbound pump (runs on this task) ─────────────────────────────────────
    let acks = config.acknowledge.then(|| outgoing_tx.clone());
    drop(outgoing_tx);
    let reader = FrameReader::with_limit(stdin, config.max_frame_bytes);
    StdioPump::new(reader, link.clone(), acks, shutdown.clone())
        .run()
        .await;

    // ── Teardown ──────────────────────────────────────────────────────────────
    shutdown.cancel();
    link.shutdown();
    if let Err(e) = link_task.await {
        warn!("daemon link task ended abnormally: {e}");
    }
    // Every sender is gone now, so the writer drains its queue and exits.
    if let Err(e) = writer.await {
        warn!("stdout writer ended abnormally: {e}");
    }
    if let Some(server) = server {
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("HTTP bridge failed: {e}"),
            Err(e) => warn!("HTTP bridge task ended abnormally: {e}"),
        }
    }

    info!("native host stopped");
    Ok(())
}
