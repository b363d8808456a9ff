//! Server mode implementation
//!
//! One session at a time: bind, wait for a single peer, run the transfer
//! loop, print the session report, release every socket and file handle,
//! then loop back and wait again. The lifecycle is an explicit state
//! machine rather than an unstructured infinite loop, so "session aborted"
//! is a transition instead of an early return.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use tokio::fs::File;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tracing::{error, info};

use crate::config::{DEFAULT_CHUNK_SIZE, DEFAULT_PORT, NOMINAL_TRANSFER_SIZE, Transport};
use crate::net;
use crate::report::TransferReport;
use crate::{tcp, udp};

/// Pause between sessions before rebinding.
const RESTART_DELAY: Duration = Duration::from_millis(1);

pub struct ServerConfig {
    pub transport: Transport,
    pub port: u16,
    pub chunk_size: usize,
    /// When set, received data is also written to this file.
    pub file: Option<PathBuf>,
    /// Exit after one session instead of restarting forever.
    pub one_off: bool,
    /// Print session reports as JSON objects.
    pub json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Tcp,
            port: DEFAULT_PORT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            file: None,
            one_off: false,
            json: false,
        }
    }
}

/// Session lifecycle. SessionComplete loops back to Idle unless the server
/// is one-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Idle,
    AwaitingPeer,
    InSession,
    SessionComplete,
}

/// Bound resources for one session. Dropping this closes both the accepted
/// connection and the listening socket.
enum Session {
    Tcp {
        listener: TcpListener,
        stream: TcpStream,
        peer: SocketAddr,
    },
    Udp(UdpSocket),
}

pub struct Server {
    config: ServerConfig,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Drive the session state machine. Returns only for one-off servers.
    pub async fn run(&self) -> anyhow::Result<()> {
        let mut state = SessionState::Idle;
        let mut pending: Option<Session> = None;

        loop {
            state = match state {
                SessionState::Idle => SessionState::AwaitingPeer,

                SessionState::AwaitingPeer => match self.await_peer().await {
                    Ok(session) => {
                        pending = Some(session);
                        SessionState::InSession
                    }
                    Err(e) => {
                        error!("Session setup failed: {}", e);
                        SessionState::SessionComplete
                    }
                },

                SessionState::InSession => {
                    // take() guarantees the sockets are dropped on every
                    // exit path before the next session binds.
                    if let Some(session) = pending.take() {
                        match self.run_session(session).await {
                            Ok(report) => self.print_report(&report)?,
                            Err(e) => error!("Session aborted: {}", e),
                        }
                    }
                    SessionState::SessionComplete
                }

                SessionState::SessionComplete => {
                    if self.config.one_off {
                        return Ok(());
                    }
                    tokio::time::sleep(RESTART_DELAY).await;
                    SessionState::Idle
                }
            };
        }
    }

    /// Bind the transport and, for TCP, block until one peer connects.
    async fn await_peer(&self) -> anyhow::Result<Session> {
        match self.config.transport {
            Transport::Tcp => {
                let listener = net::create_tcp_listener(self.config.port).await?;
                let (stream, peer) = listener.accept().await?;
                info!("Accepted connection, client is {}", peer);
                Ok(Session::Tcp {
                    listener,
                    stream,
                    peer,
                })
            }
            Transport::Udp => {
                let socket = net::create_udp_socket(self.config.port).await?;
                Ok(Session::Udp(socket))
            }
        }
    }

    async fn run_session(&self, session: Session) -> anyhow::Result<TransferReport> {
        match session {
            Session::Tcp {
                listener: _listener,
                stream,
                peer,
            } => {
                let out = self.open_output().await?;
                let counters = tcp::receive_stream(stream, self.config.chunk_size, out).await?;
                Ok(TransferReport::received(
                    &counters,
                    Some(peer.to_string()),
                    None,
                ))
            }
            Session::Udp(socket) => {
                let (counters, peer) = udp::receive_session(
                    socket,
                    self.config.chunk_size,
                    self.config.file.as_deref(),
                )
                .await?;
                // UDP loss is accounted against the nominal 1 GB transfer.
                Ok(TransferReport::received(
                    &counters,
                    Some(peer.to_string()),
                    Some(NOMINAL_TRANSFER_SIZE),
                ))
            }
        }
    }

    async fn open_output(&self) -> anyhow::Result<Option<File>> {
        match &self.config.file {
            Some(path) => Ok(Some(File::create(path).await.with_context(|| {
                format!("opening output file [{}]", path.display())
            })?)),
            None => Ok(None),
        }
    }

    fn print_report(&self, report: &TransferReport) -> anyhow::Result<()> {
        if self.config.json {
            println!("{}", report.json()?);
        } else {
            println!("{}", report.plain());
        }
        Ok(())
    }
}
