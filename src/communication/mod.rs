//! Transports that carry encoded reports off the board.

pub mod memory;
pub mod serial;
pub mod udp;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use memory::MemoryTransport;
pub use serial::SerialTransport;
pub use udp::UdpTransport;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("partial write: {written} of {expected} bytes")]
    PartialWrite { written: usize, expected: usize },
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Something that can deliver one encoded message.
///
/// Implementations do not retry; the reporter treats every failure as a lost
/// message.
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &str;
    async fn send(&self, message: &[u8]) -> Result<(), TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn send(&self, message: &[u8]) -> Result<(), TransportError> {
        (**self).send(message).await
    }
}

/// Writes every report to the log; used when no serial or network push is configured.
#[derive(Debug, Default)]
pub struct LogTransport;

#[async_trait]
impl Transport for LogTransport {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, message: &[u8]) -> Result<(), TransportError> {
        match std::str::from_utf8(message) {
            Ok(text) => tracing::info!("Report: {}", text.trim_end()),
            Err(_) => tracing::info!("Report: {} bytes {:02x?}", message.len(), message),
        }
        Ok(())
    }
}
