//! Client mode implementation
//!
//! Connects to a server and pushes the pattern stream, over TCP with no
//! application-level flow control or over UDP with the STX/ACK protocol.

use tracing::info;

use crate::config::{DEFAULT_CHUNK_SIZE, DEFAULT_PORT, NOMINAL_TRANSFER_SIZE, Transport};
use crate::net;
use crate::report::TransferReport;
use crate::{tcp, udp};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub transport: Transport,
    pub chunk_size: usize,
    pub target_bytes: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            transport: Transport::Tcp,
            chunk_size: DEFAULT_CHUNK_SIZE,
            target_bytes: NOMINAL_TRANSFER_SIZE,
        }
    }
}

pub struct Client {
    config: ClientConfig,
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Run one transfer session and return its report.
    ///
    /// Resolve/connect failures are returned without a report; once the
    /// transfer loop has started, I/O anomalies are logged and the report
    /// reflects whatever was written.
    pub async fn run(&self) -> anyhow::Result<TransferReport> {
        info!(
            "Connecting to {}:{} over {}",
            self.config.host, self.config.port, self.config.transport
        );

        let counters = match self.config.transport {
            Transport::Tcp => {
                let stream = net::connect_tcp(&self.config.host, self.config.port).await?;
                tcp::send_pattern(stream, self.config.chunk_size, self.config.target_bytes).await?
            }
            Transport::Udp => {
                let socket = net::connect_udp(&self.config.host, self.config.port).await?;
                udp::send_chunks(socket, self.config.chunk_size, self.config.target_bytes).await?
            }
        };

        Ok(TransferReport::sent(
            &counters,
            Some(self.config.target_bytes),
        ))
    }
}
