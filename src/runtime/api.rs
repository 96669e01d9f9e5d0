//! API-facing request/response models.
//!
//! These are the shapes an HTTP layer would serialize. Routing and
//! authentication live outside this crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{DispatchError, Operation, OperationId, OperationStatus, Orchestrator, Submission};

/// Poll response for one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationStatusResponse {
    /// Operation identifier.
    pub operation_id: String,
    /// Lifecycle state.
    pub status: OperationStatus,
    /// Recipients accepted into the operation.
    pub total_emails: usize,
    /// Successful deliveries.
    pub sent_count: usize,
    /// Failed deliveries.
    pub failed_count: usize,
    /// Derived progress, `0..=100`.
    pub progress_percentage: f64,
    /// Rendered error log, in attempt order.
    pub errors: Vec<String>,
    /// Start of the send loop.
    pub started_at: Option<DateTime<Utc>>,
    /// Terminal transition time.
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Operation> for OperationStatusResponse {
    fn from(operation: &Operation) -> Self {
        let mut errors: Vec<String> = operation.errors.iter().map(ToString::to_string).collect();
        if operation.errors_omitted > 0 {
            errors.push(format!("{} more errors omitted", operation.errors_omitted));
        }
        Self {
            operation_id: operation.id.to_string(),
            status: operation.status,
            total_emails: operation.total,
            sent_count: operation.sent_count,
            failed_count: operation.failed_count,
            progress_percentage: operation.progress_percentage(),
            errors,
            started_at: operation.started_at,
            completed_at: operation.completed_at,
        }
    }
}

/// Recipient left out at submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionResponse {
    /// Recipient key.
    pub recipient: String,
    /// Human readable reason.
    pub reason: String,
}

/// Response to an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResponse {
    /// Always `true` for accepted submissions.
    pub success: bool,
    /// Summary line.
    pub message: String,
    /// Identifier to poll.
    pub operation_id: String,
    /// Recipients accepted into the operation.
    pub total_emails: usize,
    /// Recipients filtered out.
    pub excluded: Vec<ExclusionResponse>,
}

impl From<&Submission> for SubmissionResponse {
    fn from(submission: &Submission) -> Self {
        Self {
            success: true,
            message: format!("Emails are being sent to {} recipients", submission.accepted),
            operation_id: submission.operation_id.to_string(),
            total_emails: submission.accepted,
            excluded: submission
                .excluded
                .iter()
                .map(|exclusion| ExclusionResponse {
                    recipient: exclusion.recipient.clone(),
                    reason: exclusion.reason.to_string(),
                })
                .collect(),
        }
    }
}

/// Health response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
    /// Transport answered its probe.
    pub transport_reachable: bool,
    /// Executors still running.
    pub active_operations: usize,
}

/// Poll one operation by its textual identifier.
pub fn operation_status(
    orchestrator: &Orchestrator,
    operation_id: &str,
) -> Result<OperationStatusResponse, DispatchError> {
    let operation = orchestrator.status(&OperationId::from(operation_id))?;
    Ok(OperationStatusResponse::from(&operation))
}

/// Poll one operation and render the JSON body.
pub fn operation_status_json(
    orchestrator: &Orchestrator,
    operation_id: &str,
) -> Result<String, DispatchError> {
    let response = operation_status(orchestrator, operation_id)?;
    Ok(serde_json::to_string(&response)?)
}

/// Poll responses for every operation, oldest first.
pub fn list_operations(
    orchestrator: &Orchestrator,
) -> Result<Vec<OperationStatusResponse>, DispatchError> {
    Ok(orchestrator
        .list()?
        .iter()
        .map(OperationStatusResponse::from)
        .collect())
}

/// Return a health payload.
pub async fn health(orchestrator: &Orchestrator) -> Health {
    let transport_reachable = orchestrator.transport_reachable().await;
    Health {
        ok: transport_reachable,
        transport_reachable,
        active_operations: orchestrator.active_operations(),
    }
}
