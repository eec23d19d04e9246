//! Production UDP transport.
//!
//! Reference: spec.md Section 5 (suspension points: "awaiting a UDP
//! datagram"), Section 6 ("Wire protocol")

use std::net::Ipv4Addr;

use async_trait::async_trait;
use tokio::net::UdpSocket;

use crate::ports::Transport;

/// Wraps a bound `tokio::net::UdpSocket`.
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    pub async fn bind(port: u16) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", port)).await?;
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.socket.local_addr()
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send_to(&self, data: &[u8], addr: Ipv4Addr, port: u16) -> std::io::Result<()> {
        self.socket.send_to(data, (addr, port)).await?;
        Ok(())
    }

    async fn recv_from(&self) -> std::io::Result<(Vec<u8>, Ipv4Addr, u16)> {
        let mut buf = vec![0u8; crate::krpc::codec::MAX_DATAGRAM_LEN];
        let (len, from) = self.socket.recv_from(&mut buf).await?;
        buf.truncate(len);
        let addr = match from.ip() {
            std::net::IpAddr::V4(v4) => v4,
            std::net::IpAddr::V6(_) => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "IPv6 senders are not supported (spec.md Section 1: IPv4 compact addressing only)",
                ))
            }
        };
        Ok((buf, addr, from.port()))
    }
}

/// Forwarding impl so the process entry point can hold an `Arc<UdpTransport>`
/// to drive the receive loop while also handing the engine a boxed
/// `Transport` backed by the same socket.
#[async_trait]
impl Transport for std::sync::Arc<UdpTransport> {
    async fn send_to(&self, data: &[u8], addr: Ipv4Addr, port: u16) -> std::io::Result<()> {
        self.as_ref().send_to(data, addr, port).await
    }

    async fn recv_from(&self) -> std::io::Result<(Vec<u8>, Ipv4Addr, u16)> {
        self.as_ref().recv_from().await
    }
}
