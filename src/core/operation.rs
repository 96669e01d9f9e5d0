//! Operation record and its lifecycle transitions.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{MessageKind, OperationId};

/// Lifecycle state of an operation.
///
/// `Pending → InProgress → {Completed, Failed}`. Terminal states accept no
/// further mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Created, executor not started yet (or waiting for a concurrency permit).
    Pending,
    /// Send loop running.
    InProgress,
    /// Every accepted recipient was attempted.
    Completed,
    /// The operation could not produce a result.
    Failed,
}

impl OperationStatus {
    /// Whether no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        match self {
            Self::Pending | Self::InProgress => false,
            Self::Completed | Self::Failed => true,
        }
    }

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in an operation's error log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Recipient the failure belongs to; `None` for whole-operation failures.
    pub recipient: Option<String>,
    /// Human readable cause.
    pub reason: String,
}

impl FailureRecord {
    /// Failure scoped to a single recipient.
    pub fn recipient(recipient: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            recipient: Some(recipient.into()),
            reason: reason.into(),
        }
    }

    /// Synthetic failure describing the whole operation.
    pub fn operation(reason: impl Into<String>) -> Self {
        Self {
            recipient: None,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.recipient {
            Some(recipient) => write!(f, "{recipient}: {}", self.reason),
            None => f.write_str(&self.reason),
        }
    }
}

/// Snapshot of one bulk dispatch attempt.
///
/// Values handed out by the registry are copies; mutating them has no effect
/// on the live record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Identifier.
    pub id: OperationId,
    /// Kind of message dispatched.
    pub kind: MessageKind,
    /// Current state.
    pub status: OperationStatus,
    /// Recipients accepted at submission.
    pub total: usize,
    /// Successful deliveries.
    pub sent_count: usize,
    /// Failed deliveries, including recipients never attempted after a
    /// whole-operation failure.
    pub failed_count: usize,
    /// Recorded failures in attempt order.
    pub errors: Vec<FailureRecord>,
    /// Per-recipient failures dropped once the error log reached its bound.
    pub errors_omitted: usize,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Set when the executor starts the send loop.
    pub started_at: Option<DateTime<Utc>>,
    /// Set on the terminal transition.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Operation {
    /// Fresh pending operation.
    #[must_use]
    pub const fn new(
        id: OperationId,
        kind: MessageKind,
        total: usize,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind,
            status: OperationStatus::Pending,
            total,
            sent_count: 0,
            failed_count: 0,
            errors: Vec::new(),
            errors_omitted: 0,
            created_at,
            started_at: None,
            completed_at: None,
        }
    }

    /// Recipients attempted so far.
    #[must_use]
    pub const fn processed(&self) -> usize {
        self.sent_count + self.failed_count
    }

    /// Recipients not attempted yet.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.total.saturating_sub(self.processed())
    }

    /// Derived progress in `0..=100`. An empty operation reports 100 once
    /// terminal.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress_percentage(&self) -> f64 {
        if self.total == 0 {
            return if self.status.is_terminal() { 100.0 } else { 0.0 };
        }
        100.0 * self.processed() as f64 / self.total as f64
    }

    pub(crate) fn start(&mut self, at: DateTime<Utc>) {
        self.status = OperationStatus::InProgress;
        self.started_at = Some(at);
    }

    pub(crate) fn record_success(&mut self) {
        if self.remaining() > 0 {
            self.sent_count += 1;
        }
    }

    pub(crate) fn record_failure(&mut self, recipient: &str, reason: &str, max_errors: usize) {
        if self.remaining() == 0 {
            return;
        }
        self.failed_count += 1;
        if self.errors.len() < max_errors {
            self.errors.push(FailureRecord::recipient(recipient, reason));
        } else {
            self.errors_omitted += 1;
        }
    }

    pub(crate) fn finish(&mut self, at: DateTime<Utc>) {
        self.status = OperationStatus::Completed;
        self.completed_at = Some(at);
    }

    /// Terminal failure. Unattempted recipients are counted as failed so the
    /// terminal record always satisfies `sent + failed == total`.
    pub(crate) fn abort(&mut self, cause: &str, at: DateTime<Utc>) {
        let remaining = self.remaining();
        let reason = if remaining > 0 {
            format!("{cause}; {remaining} recipients not attempted")
        } else {
            cause.to_owned()
        };
        self.failed_count += remaining;
        self.errors.push(FailureRecord::operation(reason));
        self.status = OperationStatus::Failed;
        self.completed_at = Some(at);
    }
}
