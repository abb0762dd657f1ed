//! Datagram push to a fixed listener on the lab network.
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::net::UdpSocket;

use super::{Transport, TransportError};

pub struct UdpTransport {
    socket: UdpSocket,
    target: SocketAddr,
    name: String,
}

impl UdpTransport {
    /// Binds an ephemeral local port on the same address family as `target`.
    pub async fn connect(target: SocketAddr) -> Result<Self, TransportError> {
        let bind: SocketAddr = if target.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind).await?;
        tracing::info!("UDP reports from {} to {}", socket.local_addr()?, target);
        Ok(Self {
            socket,
            target,
            name: format!("udp:{target}"),
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

#[async_trait]
impl Transport for UdpTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, message: &[u8]) -> Result<(), TransportError> {
        let written = self.socket.send_to(message, self.target).await?;
        if written != message.len() {
            return Err(TransportError::PartialWrite {
                written,
                expected: message.len(),
            });
        }
        Ok(())
    }
}
