//! Serial console transport.
use async_trait::async_trait;
use serial2_tokio::SerialPort;
use tokio::io::AsyncWriteExt;

use super::{Transport, TransportError};

pub struct SerialTransport {
    port: SerialPort,
    name: String,
}

impl SerialTransport {
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, TransportError> {
        tracing::info!("Opening serial report port {} at {} baud", path, baud_rate);
        let port = SerialPort::open(path, baud_rate)?;
        Ok(Self::from_port(port, path))
    }

    /// Wraps an already opened port.
    pub fn from_port(port: SerialPort, path: &str) -> Self {
        Self {
            port,
            name: format!("serial:{path}"),
        }
    }
}

#[async_trait]
impl Transport for SerialTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, message: &[u8]) -> Result<(), TransportError> {
        let mut port = &self.port;
        port.write_all(message).await?;
        tracing::trace!("Serial TX: {} bytes", message.len());
        Ok(())
    }
}
