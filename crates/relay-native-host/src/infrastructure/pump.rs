//! The outbound half of the stdio pump: browser → daemon.
//!
//! The inbound half needs no loop of its own: the daemon link delivers every
//! message to a [`BrowserSink`](super::BrowserSink), which queues it for the
//! stdout writer.

use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use relay_core::protocol::summarize;
use relay_core::{DaemonLinkHandle, Message};

use crate::application::{route, Ack, Route};
use crate::domain::HostMessage;
use crate::infrastructure::stdio::FrameReader;

/// Reads browser frames and routes each one to the daemon link.
pub struct StdioPump<R> {
    reader: FrameReader<R>,
    link: DaemonLinkHandle,
    /// Acknowledgement queue (the stdout writer); `None` when acks are off.
    acks: Option<mpsc::UnboundedSender<Message>>,
    shutdown: CancellationToken,
}

impl<R: AsyncRead + Unpin> StdioPump<R> {
    pub fn new(
        reader: FrameReader<R>,
        link: DaemonLinkHandle,
        acks: Option<mpsc::UnboundedSender<Message>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            reader,
            link,
            acks,
            shutdown,
        }
    }

    /// Runs until stdin ends or `shutdown` is cancelled.
    ///
    /// End of stdin cancels `shutdown`, which stops the daemon link and the
    /// rest of the host.  Unreadable frames are logged and skipped.
    pub async fn run(mut self) {
        info!("stdio pump started");
        loop {
            let frame = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                frame = self.reader.read_frame() => frame,
            };

            match frame {
                Ok(Some(message)) => self.handle(message).await,
                Ok(None) => {
                    info!("browser closed stdin; shutting down");
                    self.shutdown.cancel();
                    break;
                }
                Err(e) => warn!("dropping frame from browser: {e}"),
            }
        }
        info!("stdio pump stopped");
    }

    async fn handle(&self, message: Message) {
        debug!("← browser: {}", summarize(&message));

        let ack = match route(HostMessage::from_browser(message)) {
            Route::ToDaemon(forwarded) => {
                let sent = self.link.send(forwarded.clone()).await;
                if !sent {
                    warn!("daemon unavailable; dropped {}", summarize(&forwarded));
                }
                Ack::for_forwarded(&forwarded, sent)
            }
            Route::Drop(reason) => {
                warn!("{reason}");
                Ack::Rejected { reason }
            }
            Route::ToBrowser(_) => return,
        };

        if let Some(acks) = &self.acks {
            if acks.send(ack.into_message()).is_err() {
                debug!("stdout writer gone; acknowledgement discarded");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use relay_core::{DaemonLink, LinkConfig};
    use serde_json::{json, Value};
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::UnixListener;
    use tokio_test::io::Builder;

    fn frame(json: &str) -> Vec<u8> {
        let mut bytes = (json.len() as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(json.as_bytes());
        bytes
    }

    fn link_config(path: std::path::PathBuf) -> LinkConfig {
        LinkConfig {
            socket_path: path,
            reconnect_backoff: Duration::from_secs(60),
            ..LinkConfig::default()
        }
    }

    #[tokio::test]
    async fn test_stdin_eof_cancels_shutdown() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let shutdown = CancellationToken::new();
        let (link, task) = DaemonLink::spawn(
            link_config(dir.path().join("missing.sock")),
            Vec::new(),
            shutdown.clone(),
        );
        let reader = FrameReader::new(Builder::new().build());

        // Act
        StdioPump::new(reader, link, None, shutdown.clone()).run().await;

        // Assert
        assert!(shutdown.is_cancelled());
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_routes_url_and_focus_ack_in_order() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daemon.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let shutdown = CancellationToken::new();
        let (link, task) = DaemonLink::spawn(link_config(path), Vec::new(), shutdown.clone());

        let mut stdin = frame(r#"{"url":"https://example.com"}"#);
        stdin.extend(frame(r#"{"hello":"world"}"#));
        stdin.extend(frame(r#"{"action":"focusAck","seq":2}"#));
        let reader = FrameReader::new(Builder::new().read(&stdin).build());

        // Act
        StdioPump::new(reader, link, None, shutdown.clone()).run().await;

        // Assert: registration, then the two routable messages only
        let (stream, _) = listener.accept().await.unwrap();
        let mut lines = BufReader::new(stream).lines();
        assert_eq!(
            lines.next_line().await.unwrap().unwrap(),
            r#"{"command":"registerNativeHost"}"#
        );
        assert_eq!(
            lines.next_line().await.unwrap().unwrap(),
            r#"{"command":"setActiveTabUrl","url":"https://example.com"}"#
        );
        assert_eq!(
            lines.next_line().await.unwrap().unwrap(),
            r#"{"command":"focusAck"}"#
        );
        task.await.unwrap();
        assert!(lines.next_line().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_acks_report_outcome() {
        // Arrange: daemon absent, acks on
        let dir = tempfile::tempdir().unwrap();
        let shutdown = CancellationToken::new();
        let (link, task) = DaemonLink::spawn(
            link_config(dir.path().join("missing.sock")),
            Vec::new(),
            shutdown.clone(),
        );
        let mut stdin = frame(r#"{"url":"https://example.com"}"#);
        stdin.extend(frame(r#"{"action":"dance"}"#));
        let reader = FrameReader::new(Builder::new().read(&stdin).build());
        let (acks_tx, mut acks_rx) = mpsc::unbounded_channel();

        // Act
        StdioPump::new(reader, link, Some(acks_tx), shutdown).run().await;
        task.await.unwrap();

        // Assert
        let failed = acks_rx.recv().await.unwrap();
        assert_eq!(
            Value::Object(failed),
            json!({"status": "error", "url": "https://example.com"})
        );
        let rejected = acks_rx.recv().await.unwrap();
        assert_eq!(rejected["status"], "error");
        assert!(rejected["message"].as_str().unwrap().contains("dance"));
    }
}
