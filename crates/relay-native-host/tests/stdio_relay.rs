//! End-to-end tests of the native host: stdio pipes on one side, a Unix
//! socket daemon on the other.

use std::time::Duration;

use relay_core::protocol::decode_frame;
use relay_core::LinkConfig;
use relay_native_host::domain::HostConfig;
use relay_native_host::infrastructure::run_host;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, DuplexStream};
use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;

fn frame(json: &str) -> Vec<u8> {
    let mut bytes = (json.len() as u32).to_le_bytes().to_vec();
    bytes.extend_from_slice(json.as_bytes());
    bytes
}

async fn read_stdout_frame(stdout: &mut DuplexStream) -> Value {
    let mut prefix = [0u8; 4];
    stdout.read_exact(&mut prefix).await.unwrap();
    let mut body = vec![0u8; u32::from_le_bytes(prefix) as usize];
    stdout.read_exact(&mut body).await.unwrap();
    let mut whole = prefix.to_vec();
    whole.extend_from_slice(&body);
    let (message, _) = decode_frame(&whole).unwrap();
    Value::Object(message)
}

fn host_config(socket_path: std::path::PathBuf, acknowledge: bool) -> HostConfig {
    HostConfig {
        link: LinkConfig {
            socket_path,
            reconnect_backoff: Duration::from_secs(60),
            ..LinkConfig::default()
        },
        acknowledge,
        ..HostConfig::default()
    }
}

#[tokio::test]
async fn test_url_from_browser_reaches_daemon_and_daemon_push_reaches_stdout() {
    // Arrange: daemon socket and stdio pipes
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("daemon.sock");
    let daemon = UnixListener::bind(&path).unwrap();
    let (mut browser_in, host_stdin) = tokio::io::duplex(64 * 1024);
    let (host_stdout, mut browser_out) = tokio::io::duplex(64 * 1024);
    let shutdown = CancellationToken::new();
    let host = tokio::spawn(run_host(
        host_config(path, false),
        host_stdin,
        host_stdout,
        shutdown.clone(),
    ));

    let (stream, _) = daemon.accept().await.unwrap();
    let (daemon_read, mut daemon_write) = stream.into_split();
    let mut daemon_lines = BufReader::new(daemon_read).lines();
    assert_eq!(
        daemon_lines.next_line().await.unwrap().unwrap(),
        r#"{"command":"registerNativeHost"}"#
    );

    // Act: browser → daemon
    browser_in
        .write_all(&frame(r#"{"url":"https://example.com"}"#))
        .await
        .unwrap();

    // Assert
    assert_eq!(
        daemon_lines.next_line().await.unwrap().unwrap(),
        r#"{"command":"setActiveTabUrl","url":"https://example.com"}"#
    );

    // Act: daemon → browser
    daemon_write
        .write_all(b"{\"seq\":5,\"action\":\"ping\"}\n")
        .await
        .unwrap();

    // Assert: forwarded unchanged, key order included
    let mut prefix = [0u8; 4];
    browser_out.read_exact(&mut prefix).await.unwrap();
    let mut body = vec![0u8; u32::from_le_bytes(prefix) as usize];
    browser_out.read_exact(&mut body).await.unwrap();
    assert_eq!(body, br#"{"seq":5,"action":"ping"}"#.to_vec());

    // Act: browser closes stdin
    drop(browser_in);

    // Assert: the host exits on its own
    tokio::time::timeout(Duration::from_secs(5), host)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(shutdown.is_cancelled());
}

#[tokio::test]
async fn test_acks_share_stdout_with_daemon_messages() {
    // Arrange: acks on, no daemon
    let dir = tempfile::tempdir().unwrap();
    let (mut browser_in, host_stdin) = tokio::io::duplex(64 * 1024);
    let (host_stdout, mut browser_out) = tokio::io::duplex(64 * 1024);
    let host = tokio::spawn(run_host(
        host_config(dir.path().join("missing.sock"), true),
        host_stdin,
        host_stdout,
        CancellationToken::new(),
    ));

    // Act
    browser_in
        .write_all(&frame(r#"{"url":"https://example.com"}"#))
        .await
        .unwrap();
    browser_in.write_all(&frame(r#"{"nothing":1}"#)).await.unwrap();

    // Assert
    assert_eq!(
        read_stdout_frame(&mut browser_out).await,
        json!({"status": "error", "url": "https://example.com"})
    );
    let rejected = read_stdout_frame(&mut browser_out).await;
    assert_eq!(rejected["status"], "error");
    assert!(rejected["message"].is_string());

    drop(browser_in);
    tokio::time::timeout(Duration::from_secs(5), host)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_oversize_frame_is_dropped_and_pump_continues() {
    // Arrange: small frame limit
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("daemon.sock");
    let daemon = UnixListener::bind(&path).unwrap();
    let (mut browser_in, host_stdin) = tokio::io::duplex(64 * 1024);
    let (host_stdout, _browser_out) = tokio::io::duplex(64 * 1024);
    let config = HostConfig {
        max_frame_bytes: 64,
        ..host_config(path, false)
    };
    let host = tokio::spawn(run_host(config, host_stdin, host_stdout, CancellationToken::new()));
    let (stream, _) = daemon.accept().await.unwrap();
    let mut lines = BufReader::new(stream).lines();
    lines.next_line().await.unwrap();

    // Act
    let big = format!(r#"{{"command":"x","pad":"{}"}}"#, "p".repeat(200));
    browser_in.write_all(&frame(&big)).await.unwrap();
    browser_in.write_all(&frame(r#"{"command":"small"}"#)).await.unwrap();

    // Assert: only the small command got through
    assert_eq!(
        lines.next_line().await.unwrap().unwrap(),
        r#"{"command":"small"}"#
    );

    drop(browser_in);
    tokio::time::timeout(Duration::from_secs(5), host)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
