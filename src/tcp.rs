//! TCP data transfer loops
//!
//! A plain byte-stream copy with no application-level flow control: the
//! client writes pattern chunks as fast as the socket accepts them, the
//! server reads until the peer closes.

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{error, warn};

use crate::pattern::pattern_buffer;
use crate::report::SessionCounters;

/// Write `ceil(target_bytes / chunk_size)` full pattern chunks, then close.
///
/// Partial writes are counted as-is; a write error ends the loop but the
/// session still reports what was transferred.
pub async fn send_pattern(
    mut stream: TcpStream,
    chunk_size: usize,
    target_bytes: u64,
) -> anyhow::Result<SessionCounters> {
    let buffer = pattern_buffer(chunk_size);
    let n_blocks = target_bytes.div_ceil(chunk_size as u64);
    let mut counters = SessionCounters::start();

    for _ in 0..n_blocks {
        match stream.write(&buffer).await {
            Ok(n) => {
                if n != chunk_size {
                    warn!("Short write on TCP socket: {} of {} bytes", n, chunk_size);
                }
                counters.add_written(n as u64);
            }
            Err(e) => {
                error!("Write error on TCP socket: {}", e);
                break;
            }
        }
    }

    let _ = stream.shutdown().await;
    Ok(counters)
}

/// Read chunks until the peer closes, optionally copying each to a file.
///
/// A read error aborts the loop without failing the session; the counters
/// collected so far still produce a report.
pub async fn receive_stream(
    mut stream: TcpStream,
    chunk_size: usize,
    mut out: Option<File>,
) -> anyhow::Result<SessionCounters> {
    let mut buffer = vec![0u8; chunk_size];
    let mut counters = SessionCounters::start();

    loop {
        let n = match stream.read(&mut buffer).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                error!("Read error on TCP socket: {}", e);
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
    }

    if let Some(mut file) = out {
        let _ = file.flush().await;
    }
    Ok(counters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_loopback_byte_count() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            receive_stream(stream, 8000, None).await.unwrap()
        });

        let stream = TcpStream::connect(addr).await.unwrap();
        // 125 chunks of 8000 bytes
        let sent = send_pattern(stream, 8000, 1_000_000).await.unwrap();
        assert_eq!(sent.bytes_written, 1_000_000);

        let received = server.await.unwrap();
        assert_eq!(received.bytes_read, 1_000_000);
    }

    #[tokio::test]
    async fn test_target_rounds_up_to_whole_chunks() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            receive_stream(stream, 4096, None).await.unwrap()
        });

        let stream = TcpStream::connect(addr).await.unwrap();
        // 10_000 / 4096 rounds up to 3 chunks = 12_288 bytes
        let sent = send_pattern(stream, 4096, 10_000).await.unwrap();
        assert_eq!(sent.bytes_written, 12_288);
        assert_eq!(server.await.unwrap().bytes_read, 12_288);
    }
}
