//! Collaborator traits the orchestrator drives.
//!
//! Delivery and recipient lookup live outside this crate; the orchestrator
//! only sees these two seams.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{DirectoryError, Recipient, RecipientAttributes, TransportError};

/// Delivers one message to one recipient.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use bulk_notify::core::{Recipient, Transport, TransportError};
///
/// struct SmtpTransport { /* connection settings */ }
///
/// #[async_trait]
/// impl Transport for SmtpTransport {
///     async fn send(&self, recipient: &Recipient, subject: &str, body: &str) -> Result<(), TransportError> {
///         // hand the message to the SMTP relay
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Attempt delivery. Errors are scoped to this recipient and never abort
    /// the surrounding operation.
    async fn send(
        &self,
        recipient: &Recipient,
        subject: &str,
        body: &str,
    ) -> Result<(), TransportError>;

    /// Connectivity probe used by health checks.
    async fn check(&self) -> bool {
        true
    }
}

/// Read access to recipient state, plus invitation bookkeeping.
#[async_trait]
pub trait Directory: Send + Sync + 'static {
    /// Attributes for `key`, or `None` if the directory has no such recipient.
    async fn eligible_attributes(
        &self,
        key: &str,
    ) -> Result<Option<RecipientAttributes>, DirectoryError>;

    /// Remember that an invitation reached `key` at `at`.
    async fn record_invitation(&self, key: &str, at: DateTime<Utc>) -> Result<(), DirectoryError> {
        let _ = (key, at);
        Ok(())
    }
}
