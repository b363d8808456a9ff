//! Socket construction and hostname resolution.
//!
//! Sockets are built with socket2 so listener options (SO_REUSEADDR,
//! backlog) can be set before binding, then handed to tokio.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};

use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tracing::{debug, info};

/// Accept queue depth. A single peer is served at a time, so this stays small.
const LISTEN_BACKLOG: i32 = 5;

/// Create a TCP listener on 0.0.0.0:port with address reuse enabled.
pub async fn create_tcp_listener(port: u16) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;

    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
    socket.bind(&SockAddr::from(addr))?;
    socket.listen(LISTEN_BACKLOG)?;

    socket.set_nonblocking(true)?;
    let std_listener: std::net::TcpListener = socket.into();
    let listener = TcpListener::from_std(std_listener)?;

    info!("Listening on {}", addr);
    Ok(listener)
}

/// Create a UDP socket bound to 0.0.0.0:port with address reuse enabled.
pub async fn create_udp_socket(port: u16) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;

    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
    socket.bind(&SockAddr::from(addr))?;

    socket.set_nonblocking(true)?;
    let std_socket: std::net::UdpSocket = socket.into();
    let udp = UdpSocket::from_std(std_socket)?;

    debug!("UDP socket bound to {}", addr);
    Ok(udp)
}

/// Resolve a hostname to a socket address, preferring IPv4.
pub fn resolve_host(host: &str, port: u16) -> io::Result<SocketAddr> {
    let addrs: Vec<SocketAddr> = (host, port).to_socket_addrs()?.collect();

    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("Could not resolve host: {}", host),
            )
        })
}

/// Resolve and connect a TCP stream to the remote host.
pub async fn connect_tcp(host: &str, port: u16) -> io::Result<TcpStream> {
    let addr = resolve_host(host, port)?;
    debug!("Connecting to {}", addr);
    TcpStream::connect(addr).await
}

/// Create a UDP socket with the remote host as its default destination.
pub async fn connect_udp(host: &str, port: u16) -> io::Result<UdpSocket> {
    let addr = resolve_host(host, port)?;
    let bind_addr = if addr.is_ipv4() {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0)
    } else {
        SocketAddr::new(IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED), 0)
    };
    let socket = UdpSocket::bind(bind_addr).await?;
    socket.connect(addr).await?;
    debug!("UDP socket connected to {}", addr);
    Ok(socket)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_localhost() {
        let addr = resolve_host("localhost", 7001).unwrap();
        assert_eq!(addr.port(), 7001);
        assert!(addr.ip().is_loopback());
    }

    #[test]
    fn test_resolve_literal_address() {
        let addr = resolve_host("127.0.0.1", 9000).unwrap();
        assert_eq!(addr, "127.0.0.1:9000".parse().unwrap());
    }

    #[tokio::test]
    async fn test_listener_ephemeral_port() {
        let listener = create_tcp_listener(0).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_udp_socket_ephemeral_port() {
        let socket = create_udp_socket(0).await.unwrap();
        assert_ne!(socket.local_addr().unwrap().port(), 0);
    }
}
