//! xput - TCP/UDP and disk transfer rate testing
//!
//! Measures raw data-transfer throughput over three paths: TCP sockets,
//! UDP sockets, and local disk file I/O. Each invocation runs exactly one
//! of four modes: network server, network client, disk writer, disk reader.
//!
//! The UDP path layers a minimal synchronous protocol on top of datagrams:
//! a one-byte STX handshake followed by a stop-and-wait ACK per chunk.
//!
//! # Library Usage
//!
//! ```ignore
//! use xput::client::{Client, ClientConfig};
//! use xput::config::Transport;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig {
//!         host: "192.168.1.1".to_string(),
//!         transport: Transport::Udp,
//!         target_bytes: 100_000_000,
//!         ..Default::default()
//!     };
//!
//!     let report = Client::new(config).run().await?;
//!     println!("{}", report.plain());
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`server`] - Forever-restarting, one-session-at-a-time server
//! - [`client`] - One-shot client transfer
//! - [`disk`] - Disk writer and reader
//! - [`tcp`], [`udp`] - Transport transfer loops
//! - [`pattern`] - Deterministic payload/verification buffer
//! - [`report`] - Session counters and throughput reports

pub mod client;
pub mod config;
pub mod disk;
pub mod net;
pub mod pattern;
pub mod report;
pub mod server;
pub mod tcp;
pub mod udp;

pub use client::{Client, ClientConfig};
pub use config::{Mode, Termination, TransferConfig, Transport};
pub use report::TransferReport;
pub use server::{Server, ServerConfig};
