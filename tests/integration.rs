//! Integration tests for xput

use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;
use tokio::time::timeout;

use xput::client::{Client, ClientConfig};
use xput::config::Transport;
use xput::pattern::pattern_buffer;
use xput::server::{Server, ServerConfig};

// Use different ports for each test to avoid conflicts
static PORT_COUNTER: AtomicU16 = AtomicU16::new(17000);

fn get_test_port() -> u16 {
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

fn start_one_off_server(config: ServerConfig) -> tokio::task::JoinHandle<anyhow::Result<()>> {
    tokio::spawn(async move { Server::new(config).run().await })
}

#[tokio::test]
async fn test_tcp_client_reports_full_transfer() {
    let port = get_test_port();
    let server = start_one_off_server(ServerConfig {
        port,
        one_off: true,
        ..Default::default()
    });

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(200)).await;

    let client = Client::new(ClientConfig {
        host: "127.0.0.1".to_string(),
        port,
        transport: Transport::Tcp,
        chunk_size: 8000,
        target_bytes: 1_000_000,
    });

    // 125 chunks of 8000 bytes, no acks, nothing lost over loopback
    let report = timeout(Duration::from_secs(10), client.run())
        .await
        .expect("client should complete")
        .expect("client should succeed");
    assert_eq!(report.bytes_written, 1_000_000);
    assert_eq!(report.lost_bytes, Some(0));

    let server_result = timeout(Duration::from_secs(10), server)
        .await
        .expect("server should exit after one session")
        .unwrap();
    assert!(server_result.is_ok());
}

#[tokio::test]
async fn test_tcp_server_writes_pattern_stream_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("received.bin");

    let port = get_test_port();
    let server = start_one_off_server(ServerConfig {
        port,
        file: Some(out_path.clone()),
        one_off: true,
        ..Default::default()
    });

    tokio::time::sleep(Duration::from_millis(200)).await;

    let client = Client::new(ClientConfig {
        host: "127.0.0.1".to_string(),
        port,
        transport: Transport::Tcp,
        chunk_size: 8000,
        target_bytes: 100_000,
    });

    let report = timeout(Duration::from_secs(10), client.run())
        .await
        .unwrap()
        .unwrap();
    // 100_000 rounds up to 13 full chunks
    assert_eq!(report.bytes_written, 13 * 8000);

    timeout(Duration::from_secs(10), server)
        .await
        .expect("server should exit after one session")
        .unwrap()
        .unwrap();

    // The file must be the chunk-aligned pattern stream, byte for byte.
    let expected: Vec<u8> = pattern_buffer(8000).repeat(13);
    let actual = std::fs::read(&out_path).unwrap();
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn test_udp_loopback_loses_nothing() {
    let port = get_test_port();
    let server = start_one_off_server(ServerConfig {
        port,
        transport: Transport::Udp,
        one_off: true,
        ..Default::default()
    });

    tokio::time::sleep(Duration::from_millis(200)).await;

    let client = Client::new(ClientConfig {
        host: "127.0.0.1".to_string(),
        port,
        transport: Transport::Udp,
        chunk_size: 8000,
        target_bytes: 80_000,
    });

    let report = timeout(Duration::from_secs(10), client.run())
        .await
        .expect("UDP client should complete")
        .expect("UDP client should succeed");
    assert_eq!(report.bytes_written, 80_000);
    assert_eq!(report.lost_bytes, Some(0));

    // The stop-and-wait session ends with the client's empty datagram.
    timeout(Duration::from_secs(10), server)
        .await
        .expect("server should exit after one session")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_udp_server_session_ends_on_bad_handshake() {
    let port = get_test_port();
    let server = start_one_off_server(ServerConfig {
        port,
        transport: Transport::Udp,
        one_off: true,
        ..Default::default()
    });

    tokio::time::sleep(Duration::from_millis(200)).await;

    // Not STX: the session must abort without waiting for chunks.
    let socket = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    socket
        .send_to(&[0x41], ("127.0.0.1", port))
        .await
        .unwrap();

    let server_result = timeout(Duration::from_secs(5), server)
        .await
        .expect("server must terminate the session promptly")
        .unwrap();
    assert!(server_result.is_ok());
}

#[tokio::test]
async fn test_client_connection_refused() {
    let client = Client::new(ClientConfig {
        host: "127.0.0.1".to_string(),
        port: 19999, // Unlikely to be in use
        transport: Transport::Tcp,
        chunk_size: 8000,
        target_bytes: 8000,
    });

    assert!(client.run().await.is_err(), "Should fail to connect");
}
