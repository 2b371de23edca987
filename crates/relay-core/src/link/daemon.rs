//! The persistent, registered link to the daemon.
//!
//! # Ownership model
//!
//! A single Tokio task owns the connection.  Producers (the stdio pump, HTTP
//! handlers, ...) hold cloned [`DaemonLinkHandle`]s and submit commands over an
//! unbounded channel.  The owner task runs the receive loop, decides when to
//! connect and is the only place the connection is torn down.
//!
//! Writes never run on the owner task.  Each connection has its own writer
//! task draining a FIFO queue, so a daemon that stops reading stalls only the
//! senders: inbound messages keep flowing to the sinks and shutdown is still
//! observed.  A failed write is reported back to the owner task, which drops
//! the connection.
//!
//! # State machine
//!
//! ```text
//! Disconnected ──connect ok──▶ Registered ──I/O error / EOF──▶ Disconnected
//!      ▲                                                            │
//!      └─────────────── backoff elapsed: connect() ◀────────────────┘
//! ```
//!
//! `connect()` opens the socket and writes the registration record in one
//! step; callers only ever observe `Disconnected` or `Registered`.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, warn};

use crate::link::error::LinkError;
use crate::link::sink::MessageSink;
use crate::protocol::message::{registration, summarize};
use crate::protocol::{encode_line, LineBuffer, Message};

/// Well-known location of the daemon's control socket.
pub const DEFAULT_SOCKET_PATH: &str = "/run/automatelinux/automatelinux-daemon.sock";

/// Size of each socket read.
const READ_CHUNK_SIZE: usize = 4096;

/// Settings for one [`DaemonLink`].
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Filesystem path of the daemon's Unix control socket.
    pub socket_path: PathBuf,

    /// Record written immediately after every successful connect.
    pub registration: Message,

    /// Pause between reconnect attempts while disconnected.
    pub reconnect_backoff: Duration,
}

impl Default for LinkConfig {
    /// | Field             | Default                                          |
    /// |-------------------|--------------------------------------------------|
    /// | socket_path       | `/run/automatelinux/automatelinux-daemon.sock`   |
    /// | registration      | `{"command":"registerNativeHost"}`               |
    /// | reconnect_backoff | 1 second                                         |
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            registration: registration(),
            reconnect_backoff: Duration::from_secs(1),
        }
    }
}

/// Externally visible connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No socket is open; the link retries after the backoff interval.
    Disconnected,
    /// Connected and the registration record has been written.
    Registered,
}

/// Requests from handles to the owner task.
enum LinkCommand {
    Send {
        message: Message,
        reply: oneshot::Sender<bool>,
    },
    Connect {
        reply: oneshot::Sender<bool>,
    },
}

/// What woke the owner task up.
enum LinkEvent {
    Shutdown,
    Command(Option<LinkCommand>),
    Read(io::Result<usize>),
    WriteFailed,
    RetryConnect,
}

/// Cloneable front end of a running [`DaemonLink`].
#[derive(Clone)]
pub struct DaemonLinkHandle {
    commands: mpsc::UnboundedSender<LinkCommand>,
    state: watch::Receiver<LinkState>,
    shutdown: CancellationToken,
}

impl DaemonLinkHandle {
    /// Writes `message` to the daemon, connecting first if needed.
    ///
    /// Resolves once the record is written.  Returns `false` if the daemon is
    /// unreachable, the write fails, the connection is dropped before the
    /// record goes out, or the link has stopped.  Fire-and-forget: no daemon
    /// reply is awaited.  Calls from one handle reach the socket in call
    /// order.
    pub async fn send(&self, message: Message) -> bool {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(LinkCommand::Send { message, reply }).is_err() {
            debug!("daemon link stopped; message not sent");
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Drops any current connection and connects afresh.
    pub async fn connect(&self) -> bool {
        let (reply, rx) = oneshot::channel();
        if self.commands.send(LinkCommand::Connect { reply }).is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Current connection state.
    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    /// Waits until the link reports `wanted`.  Returns `false` if the link
    /// stopped first.
    pub async fn wait_for_state(&self, wanted: LinkState) -> bool {
        let mut state = self.state.clone();
        let reached = state.wait_for(|s| *s == wanted).await.is_ok();
        reached
    }

    /// Asks the owner task to close the socket and exit.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

/// One encoded record waiting for the writer task.
struct WriteRequest {
    line: Vec<u8>,
    reply: oneshot::Sender<bool>,
}

/// An open, registered connection.
///
/// The owner task reads; writes are queued to the connection's writer task.
/// Dropping the connection stops that task and fails whatever it still holds.
struct Connection {
    reader: OwnedReadHalf,
    buffer: LineBuffer,
    writes: mpsc::UnboundedSender<WriteRequest>,
    /// Cancelled by the writer task when a write fails.
    write_failed: CancellationToken,
    _writer_stop: DropGuard,
}

/// Owner task state for the persistent daemon connection.
pub struct DaemonLink {
    config: LinkConfig,
    sinks: Vec<Arc<dyn MessageSink>>,
    commands: mpsc::UnboundedReceiver<LinkCommand>,
    commands_open: bool,
    state: watch::Sender<LinkState>,
    shutdown: CancellationToken,
    connection: Option<Connection>,
    /// Suppresses repeated warnings while the daemon stays unreachable.
    reported_unreachable: bool,
}

impl DaemonLink {
    /// Starts the link task.
    ///
    /// Every message decoded from the socket is delivered to each of `sinks`
    /// in order.  The task connects immediately, then keeps reconnecting until
    /// `shutdown` is cancelled.
    pub fn spawn(
        config: LinkConfig,
        sinks: Vec<Arc<dyn MessageSink>>,
        shutdown: CancellationToken,
    ) -> (DaemonLinkHandle, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(LinkState::Disconnected);

        let handle = DaemonLinkHandle {
            commands: commands_tx,
            state: state_rx,
            shutdown: shutdown.clone(),
        };

        let link = Self {
            config,
            sinks,
            commands: commands_rx,
            commands_open: true,
            state: state_tx,
            shutdown,
            connection: None,
            reported_unreachable: false,
        };

        (handle, tokio::spawn(link.run()))
    }

    async fn run(mut self) {
        info!(
            socket = %self.config.socket_path.display(),
            sinks = self.sinks.len(),
            "daemon link started"
        );

        self.connect().await;

        let mut chunk = vec![0u8; READ_CHUNK_SIZE];
        loop {
            match self.next_event(&mut chunk).await {
                LinkEvent::Shutdown => break,
                LinkEvent::Command(Some(command)) => self.handle_command(command).await,
                LinkEvent::Command(None) => {
                    // Every handle is gone; keep receiving for the sinks.
                    debug!("all daemon link handles dropped");
                    self.commands_open = false;
                }
                LinkEvent::Read(result) => self.handle_read(result, &chunk),
                LinkEvent::WriteFailed => self.disconnect(),
                LinkEvent::RetryConnect => {
                    self.connect().await;
                }
            }
        }

        self.disconnect();
        info!("daemon link stopped");
    }

    /// Waits for the next thing to do.  All borrows end when this returns, so
    /// the handlers are free to replace the connection.
    async fn next_event(&mut self, chunk: &mut [u8]) -> LinkEvent {
        let Self {
            config,
            commands,
            commands_open,
            shutdown,
            connection,
            ..
        } = self;

        match connection {
            Some(conn) => tokio::select! {
                _ = shutdown.cancelled() => LinkEvent::Shutdown,
                _ = conn.write_failed.cancelled() => LinkEvent::WriteFailed,
                read = conn.reader.read(chunk) => LinkEvent::Read(read),
                command = commands.recv(), if *commands_open => LinkEvent::Command(command),
            },
            None => tokio::select! {
                biased;
                _ = shutdown.cancelled() => LinkEvent::Shutdown,
                command = commands.recv(), if *commands_open => LinkEvent::Command(command),
                _ = tokio::time::sleep(config.reconnect_backoff) => LinkEvent::RetryConnect,
            },
        }
    }

    async fn handle_command(&mut self, command: LinkCommand) {
        match command {
            LinkCommand::Send { message, reply } => self.send(message, reply).await,
            LinkCommand::Connect { reply } => {
                let connected = self.connect().await;
                let _ = reply.send(connected);
            }
        }
    }

    /// Opens a fresh connection and registers.  Never fails loudly: the result
    /// is logged and reported as a boolean.
    async fn connect(&mut self) -> bool {
        self.disconnect();

        let opened = tokio::select! {
            _ = self.shutdown.cancelled() => return false,
            opened = open_registered(&self.config, &self.shutdown) => opened,
        };

        match opened {
            Ok(connection) => {
                self.connection = Some(connection);
                self.state.send_replace(LinkState::Registered);
                self.reported_unreachable = false;
                info!("connected and registered with daemon");
                true
            }
            Err(e) => {
                if self.reported_unreachable {
                    debug!("daemon still unreachable: {e}");
                } else {
                    warn!("could not connect to daemon: {e}");
                    self.reported_unreachable = true;
                }
                false
            }
        }
    }

    /// Queues `message` on the connection's writer, connecting first if
    /// needed.  `reply` is answered by the writer once the record is out.
    async fn send(&mut self, message: Message, reply: oneshot::Sender<bool>) {
        let line = match encode_line(&message) {
            Ok(line) => line,
            Err(e) => {
                error!("refusing to send unserializable message: {e}");
                let _ = reply.send(false);
                return;
            }
        };

        let stale = self
            .connection
            .as_ref()
            .is_some_and(|conn| conn.write_failed.is_cancelled());
        if stale {
            self.disconnect();
        }
        if self.connection.is_none() && !self.connect().await {
            let _ = reply.send(false);
            return;
        }
        let Some(conn) = self.connection.as_ref() else {
            let _ = reply.send(false);
            return;
        };

        debug!("→ daemon: {}", summarize(&message));
        if let Err(rejected) = conn.writes.send(WriteRequest { line, reply }) {
            let _ = rejected.0.reply.send(false);
        }
    }

    fn handle_read(&mut self, result: io::Result<usize>, chunk: &[u8]) {
        match result {
            Ok(0) => {
                info!("daemon closed the connection");
                self.disconnect();
            }
            Ok(n) => {
                let Some(conn) = self.connection.as_mut() else {
                    return;
                };
                if let Err(e) = conn.buffer.extend(&chunk[..n]) {
                    warn!("discarding daemon line: {e}");
                }
                while let Some(decoded) = conn.buffer.next_message() {
                    match decoded {
                        Ok(message) => dispatch(&self.sinks, &message),
                        Err(e) => warn!("dropping undecodable daemon line: {e}"),
                    }
                }
            }
            Err(e) => {
                warn!("read from daemon failed: {e}");
                self.disconnect();
            }
        }
    }

    /// Closes the socket (if any) and publishes `Disconnected`.
    fn disconnect(&mut self) {
        if self.connection.take().is_some() {
            debug!("daemon connection closed");
        }
        self.state.send_replace(LinkState::Disconnected);
    }
}

/// Delivers one daemon message to every sink.
fn dispatch(sinks: &[Arc<dyn MessageSink>], message: &Message) {
    debug!("← daemon: {}", summarize(message));
    for sink in sinks {
        sink.deliver(message);
    }
}

/// Connects to the socket, writes the registration record and starts the
/// connection's writer task.
async fn open_registered(
    config: &LinkConfig,
    shutdown: &CancellationToken,
) -> Result<Connection, LinkError> {
    let stream = UnixStream::connect(&config.socket_path)
        .await
        .map_err(|source| LinkError::Connect {
            path: config.socket_path.clone(),
            source,
        })?;

    let (reader, mut writer) = stream.into_split();
    let registration = encode_line(&config.registration)?;
    writer
        .write_all(&registration)
        .await
        .map_err(LinkError::Register)?;

    let (writes, queue) = mpsc::unbounded_channel();
    let write_failed = CancellationToken::new();
    let writer_stop = shutdown.child_token();
    tokio::spawn(run_writer(
        writer,
        queue,
        writer_stop.clone(),
        write_failed.clone(),
    ));

    Ok(Connection {
        reader,
        buffer: LineBuffer::new(),
        writes,
        write_failed,
        _writer_stop: writer_stop.drop_guard(),
    })
}

/// Writes queued records in order until `stop` is cancelled, the queue
/// closes, or a write fails.  Each request's `reply` carries its outcome.
async fn run_writer(
    mut writer: OwnedWriteHalf,
    mut queue: mpsc::UnboundedReceiver<WriteRequest>,
    stop: CancellationToken,
    write_failed: CancellationToken,
) {
    loop {
        let WriteRequest { line, reply } = tokio::select! {
            _ = stop.cancelled() => break,
            request = queue.recv() => match request {
                Some(request) => request,
                None => break,
            },
        };

        let written = tokio::select! {
            _ = stop.cancelled() => {
                let _ = reply.send(false);
                break;
            }
            written = writer.write_all(&line) => written,
        };

        match written {
            Ok(()) => {
                let _ = reply.send(true);
            }
            Err(e) => {
                warn!("write to daemon failed; dropping connection: {e}");
                let _ = reply.send(false);
                write_failed.cancel();
                break;
            }
        }
    }
    debug!("daemon writer stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
