//! UDP transfer with a stop-and-wait acknowledgment protocol
//!
//! UDP has no connection lifecycle or delivery guarantee, so a minimal
//! synchronous protocol is layered on top. The client opens a session with a
//! single STX byte, then alternates one data chunk with one blocking 1-byte
//! ACK read. Nothing is ever retransmitted: a lost datagram or a lost ACK is
//! logged and the loop moves on, and both sides account the shortfall at the
//! end. The session closes with an advisory zero-length datagram; the server
//! stops on whatever its own receive loop observes (empty read or error),
//! not on a sentinel check.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::Context;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::net::UdpSocket;
use tracing::{debug, error, warn};

use crate::pattern::pattern_buffer;
use crate::report::SessionCounters;

/// Start-of-transmission handshake byte.
pub const STX: u8 = 2;
/// Per-chunk acknowledgment byte.
pub const ACK: u8 = 6;

/// Client side: handshake, then stop-and-wait chunk loop.
///
/// The socket must already be connected to the server address.
pub async fn send_chunks(
    socket: UdpSocket,
    chunk_size: usize,
    target_bytes: u64,
) -> anyhow::Result<SessionCounters> {
    let buffer = pattern_buffer(chunk_size);
    let n_blocks = target_bytes.div_ceil(chunk_size as u64);
    let mut counters = SessionCounters::start();

    // Let the server know a transmission is about to start.
    match socket.send(&[STX]).await {
        Ok(1) => {}
        Ok(n) => error!("Could not send STX, n={}", n),
        Err(e) => error!("Error starting transmission: {}", e),
    }

    let mut ack = [0u8; 1];
    for _ in 0..n_blocks {
        match socket.send(&buffer).await {
            Ok(n) => {
                if n != chunk_size {
                    warn!("Short write on UDP socket: {} of {} bytes", n, chunk_size);
                }
                counters.add_written(n as u64);
            }
            Err(e) => {
                error!("Write error on UDP socket: {}", e);
                break;
            }
        }

        // The chunk or its ACK may simply be lost; proceed either way.
        match socket.recv(&mut ack).await {
            Ok(1) if ack[0] == ACK => {}
            Ok(n) => warn!("Unexpected acknowledgment, n={} byte={}", n, ack[0]),
            Err(e) => warn!("Could not read acknowledgment: {}", e),
        }
    }

    // Advisory end-of-transmission marker: one zero-length datagram.
    if let Err(e) = socket.send(&[]).await {
        warn!("Could not send end-of-transmission marker: {}", e);
    }

    Ok(counters)
}

/// Server side: expect the STX handshake, then acknowledge each chunk.
///
/// Anything other than a single STX byte as the first datagram is fatal to
/// the session (but not to the server, which restarts). The output file is
/// only created once the handshake has succeeded. Returns the session
/// counters and the handshake-learned peer address.
pub async fn receive_session(
    socket: UdpSocket,
    chunk_size: usize,
    out_path: Option<&Path>,
) -> anyhow::Result<(SessionCounters, SocketAddr)> {
    let mut buffer = vec![0u8; chunk_size];

    let (n, peer) = socket.recv_from(&mut buffer).await?;
    if n != 1 || buffer[0] != STX {
        anyhow::bail!("expected STX from {}, got {} bytes", peer, n);
    }
    debug!("Transmission started by {}", peer);

    let mut out = match out_path {
        Some(path) => Some(
            File::create(path)
                .await
                .with_context(|| format!("opening output file [{}]", path.display()))?,
        ),
        None => None,
    };

    let mut counters = SessionCounters::start();
    loop {
        let n = match socket.recv_from(&mut buffer).await {
            // Empty datagram mirrors the TCP end-of-stream convention.
            Ok((0, _)) => break,
            Ok((n, _)) => n,
            Err(e) => {
                error!("Read error on UDP socket: {}", e);
                break;
            }
        };
        counters.add_read(n as u64);

        if let Some(file) = out.as_mut() {
            match file.write(&buffer[..n]).await {
                Ok(m) => {
                    counters.add_written(m as u64);
                    if m != n {
                        error!("Short write to output file: {} of {} bytes", m, n);
                        break;
                    }
                }
                Err(e) => {
                    error!("Write error on output file: {}", e);
                    break;
                }
            }
        }

        match socket.send_to(&[ACK], peer).await {
            Ok(1) => {}
            Ok(m) => warn!("Could not send acknowledgment, n={}", m),
            Err(e) => warn!("Could not send acknowledgment: {}", e),
        }
    }

    if let Some(mut file) = out {
        let _ = file.flush().await;
    }
    Ok((counters, peer))
}
