//! Dry-run transport that logs instead of delivering.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::core::{Recipient, Transport, TransportError};

/// Accepts every message and writes it to the `tracing` log. Useful when no
/// mail relay is configured.
#[derive(Debug, Default)]
pub struct LogTransport {
    delivered: AtomicU64,
}

impl LogTransport {
    /// New dry-run transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages accepted so far.
    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Transport for LogTransport {
    async fn send(
        &self,
        recipient: &Recipient,
        subject: &str,
        body: &str,
    ) -> Result<(), TransportError> {
        if recipient.key.trim().is_empty() {
            return Err(TransportError::Rejected("empty recipient address".into()));
        }
        self.delivered.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            recipient = %recipient.key,
            subject,
            body_len = body.len(),
            "dry-run delivery"
        );
        Ok(())
    }
}
