//! Error types for dispatch operations.

use std::time::Duration;

use thiserror::Error;

use crate::core::{MessageKind, OperationId};

/// Submission-time validation failures. No operation is created when one of
/// these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The recipient list was empty.
    #[error("recipient list cannot be empty")]
    EmptyRecipients,
    /// More recipients than the cap for this message kind.
    #[error("cannot send more than {max} {kind} messages at once (got {count})")]
    TooManyRecipients {
        /// Kind of message being submitted.
        kind: MessageKind,
        /// Number of recipients supplied.
        count: usize,
        /// Configured cap.
        max: usize,
    },
    /// Inter-send delay above the configured bound.
    #[error("delay must be between 0 and {max_secs} seconds (got {requested:?})")]
    DelayOutOfRange {
        /// Delay supplied by the caller.
        requested: Duration,
        /// Upper bound in seconds.
        max_secs: u64,
    },
    /// Message subject was blank.
    #[error("message subject cannot be empty")]
    EmptySubject,
}

/// Errors produced by the orchestrator and its registry.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Submission rejected synchronously.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    /// Unknown operation identifier.
    #[error("operation not found: {0}")]
    NotFound(OperationId),
    /// Mutation attempted on an operation that already reached a terminal state.
    #[error("operation {0} is already terminal")]
    AlreadyTerminal(OperationId),
    /// Operation store failure with context.
    #[error("store error: {0}")]
    Store(String),
    /// Invalid or incomplete configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Executor task could not be joined.
    #[error("executor error: {0}")]
    Executor(String),
    /// Response rendering failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure reported by a [`Transport`](crate::core::Transport) for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The provider refused the message.
    #[error("delivery rejected: {0}")]
    Rejected(String),
    /// The provider could not be reached or timed out.
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Failure reported by a [`Directory`](crate::core::Directory) lookup or update.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("directory error: {0}")]
pub struct DirectoryError(pub String);

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
