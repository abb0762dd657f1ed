use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{Transport, TransportError};

/// Keeps every delivered message in memory. Can be switched into a failing mode.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    sent: Mutex<Vec<Vec<u8>>>,
    failing: AtomicBool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    fn name(&self) -> &str {
        "memory"
    }

    async fn send(&self, message: &[u8]) -> Result<(), TransportError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable("memory transport set to fail".to_string()));
        }
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| TransportError::Unavailable("memory transport poisoned".to_string()))?;
        sent.push(message.to_vec());
        Ok(())
    }
}
