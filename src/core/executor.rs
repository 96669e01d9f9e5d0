//! Operation executor: the send loop and its state machine.
//!
//! One executor owns one operation. It walks the accepted recipients in
//! submission order, paces transport calls through a [`RateLimiter`], and
//! records each outcome in the registry as it arrives. Per-recipient failures
//! are absorbed; only faults in the loop itself (a panic, a store failure,
//! cancellation) end the operation as `Failed`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::{
    Directory, DispatchError, Message, MessageKind, Operation, OperationId, OperationRegistry,
    OperationStatus, RateLimiter, Recipient, Transport,
};

/// Work handed to an executor.
#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    /// Operation the executor owns.
    pub operation_id: OperationId,
    /// Accepted recipients, in the order they are attempted.
    pub recipients: Vec<Recipient>,
    /// Message sent to every recipient.
    pub message: Message,
    /// Spacing between consecutive transport calls.
    pub delay: Duration,
}

/// Final state of an operation as seen by its executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Operation identifier.
    pub operation_id: OperationId,
    /// Terminal status.
    pub status: OperationStatus,
    /// Recipients accepted at submission.
    pub total: usize,
    /// Successful deliveries.
    pub sent: usize,
    /// Failed deliveries.
    pub failed: usize,
}

impl From<&Operation> for ExecutionReport {
    fn from(operation: &Operation) -> Self {
        Self {
            operation_id: operation.id.clone(),
            status: operation.status,
            total: operation.total,
            sent: operation.sent_count,
            failed: operation.failed_count,
        }
    }
}

/// Joinable handle to a running executor. Dropping it detaches the task; the
/// operation keeps running and stays observable through polling.
#[derive(Debug)]
pub struct OperationHandle {
    operation_id: OperationId,
    task: JoinHandle<ExecutionReport>,
}

impl OperationHandle {
    pub(crate) const fn new(operation_id: OperationId, task: JoinHandle<ExecutionReport>) -> Self {
        Self { operation_id, task }
    }

    /// Operation this handle belongs to.
    #[must_use]
    pub const fn operation_id(&self) -> &OperationId {
        &self.operation_id
    }

    /// Whether the executor finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the executor to reach a terminal state.
    pub async fn join(self) -> Result<ExecutionReport, DispatchError> {
        self.task
            .await
            .map_err(|e| DispatchError::Executor(e.to_string()))
    }
}

/// Drives one operation from `Pending` to a terminal state.
pub struct OperationExecutor {
    registry: OperationRegistry,
    transport: Arc<dyn Transport>,
    directory: Option<Arc<dyn Directory>>,
    cancel: CancellationToken,
    permits: Option<Arc<Semaphore>>,
    max_recorded_errors: usize,
}

impl OperationExecutor {
    /// Default bound on recorded per-recipient errors.
    pub const DEFAULT_MAX_RECORDED_ERRORS: usize = 1_000;

    /// Executor writing to `registry` and delivering through `transport`.
    pub fn new(registry: OperationRegistry, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
            directory: None,
            cancel: CancellationToken::new(),
            permits: None,
            max_recorded_errors: Self::DEFAULT_MAX_RECORDED_ERRORS,
        }
    }

    /// Record successful invitations in `directory`.
    #[must_use]
    pub fn with_directory(mut self, directory: Arc<dyn Directory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Token checked before each transport call and during each wait.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Hold a permit from `permits` while the send loop runs.
    #[must_use]
    pub fn with_permits(mut self, permits: Arc<Semaphore>) -> Self {
        self.permits = Some(permits);
        self
    }

    /// Bound on recorded per-recipient errors; later failures are only counted.
    #[must_use]
    pub const fn with_max_recorded_errors(mut self, max: usize) -> Self {
        self.max_recorded_errors = max;
        self
    }

    /// Run the operation to a terminal state.
    ///
    /// The send loop runs in its own task so that a panic inside it is caught
    /// here and recorded as a whole-operation failure instead of leaving the
    /// operation stuck in `InProgress`.
    pub async fn run(self, plan: ExecutionPlan) -> ExecutionReport {
        let id = plan.operation_id.clone();
        let registry = self.registry.clone();

        let _permit = match self.admit().await {
            Ok(permit) => permit,
            Err(cause) => {
                warn!(operation_id = %id, cause, "operation not started");
                return abort(&registry, &id, cause);
            }
        };

        match tokio::spawn(self.drive(plan)).await {
            Ok(Ok(report)) => report,
            Ok(Err(err)) => {
                error!(operation_id = %id, error = %err, "send loop failed");
                abort(&registry, &id, &format!("send loop failed: {err}"))
            }
            Err(join_err) => {
                let cause = if join_err.is_panic() {
                    "send loop panicked"
                } else {
                    "send loop was cancelled by the runtime"
                };
                error!(operation_id = %id, cause, "send loop aborted");
                abort(&registry, &id, cause)
            }
        }
    }

    async fn admit(&self) -> Result<Option<OwnedSemaphorePermit>, &'static str> {
        let Some(permits) = self.permits.clone() else {
            return Ok(None);
        };
        tokio::select! {
            () = self.cancel.cancelled() => Err("operation cancelled"),
            permit = permits.acquire_owned() => permit
                .map(Some)
                .map_err(|_| "concurrency limiter closed"),
        }
    }

    async fn drive(self, plan: ExecutionPlan) -> Result<ExecutionReport, DispatchError> {
        let id = &plan.operation_id;
        let now = self.registry.now();
        let started = self.registry.update(id, |op| op.start(now))?;
        info!(
            operation_id = %id,
            kind = %plan.message.kind,
            total = started.total,
            delay_ms = u64::try_from(plan.delay.as_millis()).unwrap_or(u64::MAX),
            "operation started"
        );

        let mut limiter = RateLimiter::new(plan.delay);
        for recipient in &plan.recipients {
            if !limiter.wait(&self.cancel).await {
                warn!(operation_id = %id, "operation cancelled");
                return Ok(abort(&self.registry, id, "operation cancelled"));
            }

            match self
                .transport
                .send(recipient, &plan.message.subject, &plan.message.body)
                .await
            {
                Ok(()) => {
                    self.registry.update(id, Operation::record_success)?;
                    debug!(operation_id = %id, recipient = %recipient.key, "delivered");
                    if plan.message.kind == MessageKind::Invitation {
                        self.record_invitation(recipient).await;
                    }
                }
                Err(err) => {
                    warn!(operation_id = %id, recipient = %recipient.key, error = %err, "delivery failed");
                    let reason = err.to_string();
                    let max = self.max_recorded_errors;
                    self.registry
                        .update(id, |op| op.record_failure(&recipient.key, &reason, max))?;
                }
            }
        }

        let now = self.registry.now();
        let finished = self.registry.update(id, |op| op.finish(now))?;
        info!(
            operation_id = %id,
            sent = finished.sent_count,
            failed = finished.failed_count,
            "operation completed"
        );
        Ok(ExecutionReport::from(&finished))
    }

    async fn record_invitation(&self, recipient: &Recipient) {
        let Some(directory) = &self.directory else {
            return;
        };
        if let Err(err) = directory
            .record_invitation(&recipient.key, self.registry.now())
            .await
        {
            warn!(recipient = %recipient.key, error = %err, "could not record invitation");
        }
    }
}

/// Move an operation to `Failed` with a single synthetic error entry.
pub(crate) fn abort(registry: &OperationRegistry, id: &OperationId, cause: &str) -> ExecutionReport {
    let now = registry.now();
    match registry.update(id, |op| op.abort(cause, now)) {
        Ok(operation) => ExecutionReport::from(&operation),
        Err(err) => {
            error!(operation_id = %id, error = %err, "could not record operation failure");
            registry.get(id).map_or_else(
                |_| ExecutionReport {
                    operation_id: id.clone(),
                    status: OperationStatus::Failed,
                    total: 0,
                    sent: 0,
                    failed: 0,
                },
                |operation| ExecutionReport::from(&operation),
            )
        }
    }
}
