//! Orchestrator facade.
//!
//! Validates a submission, filters recipients through the eligibility policy,
//! creates the operation and launches its executor, then returns right away.
//! Everything that happens after that is observed by polling [`Orchestrator::status`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::DispatchConfig;
use crate::core::eligibility::{self, EmptyBatch, Exclusion, Ineligibility};
use crate::core::executor::abort;
use crate::core::{
    Directory, DispatchError, EligibilityPolicy, ExecutionPlan, ExecutionReport, Message,
    Operation, OperationExecutor, OperationHandle, OperationId, OperationRegistry, Recipient,
    Transport, ValidationError,
};
use crate::runtime::TokioSpawner;

/// Result of an accepted submission.
#[derive(Debug)]
pub struct Submission {
    /// Identifier to poll.
    pub operation_id: OperationId,
    /// Recipients accepted into the operation.
    pub accepted: usize,
    /// Recipients filtered out before the operation was created.
    pub excluded: Vec<Exclusion>,
    /// Handle to the executor; may be dropped to detach.
    pub handle: OperationHandle,
}

/// Entry point for bulk dispatch.
pub struct Orchestrator {
    config: DispatchConfig,
    registry: OperationRegistry,
    transport: Arc<dyn Transport>,
    directory: Option<Arc<dyn Directory>>,
    spawner: TokioSpawner,
    permits: Arc<Semaphore>,
    running: Arc<Mutex<HashMap<OperationId, CancellationToken>>>,
}

impl Orchestrator {
    /// Assemble an orchestrator from its parts. Prefer
    /// [`OrchestratorBuilder`](crate::builders::OrchestratorBuilder).
    pub fn new(
        config: DispatchConfig,
        registry: OperationRegistry,
        transport: Arc<dyn Transport>,
        directory: Option<Arc<dyn Directory>>,
        spawner: TokioSpawner,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_operations));
        Self {
            config,
            registry,
            transport,
            directory,
            spawner,
            permits,
            running: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Registry backing this orchestrator.
    #[must_use]
    pub const fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Invitation policy built from the configured cooldown.
    #[must_use]
    pub fn default_policy(&self) -> EligibilityPolicy {
        self.config.default_policy()
    }

    /// Submit a batch of recipients whose attributes are already known.
    ///
    /// Returns as soon as the operation exists; no send has happened yet.
    pub fn submit(
        &self,
        recipients: Vec<Recipient>,
        message: Message,
        policy: &EligibilityPolicy,
        delay: Duration,
    ) -> Result<Submission, DispatchError> {
        self.validate(recipients.len(), &message, delay)?;
        let (accepted, excluded) = eligibility::partition(recipients, policy, self.registry.now());
        self.launch(accepted, excluded, message, policy, delay)
    }

    /// Submit a batch of directory keys, resolving each one's attributes
    /// first. Keys unknown to the directory are treated as never invited;
    /// keys whose lookup fails are excluded.
    pub async fn submit_keys(
        &self,
        keys: Vec<String>,
        message: Message,
        policy: &EligibilityPolicy,
        delay: Duration,
    ) -> Result<Submission, DispatchError> {
        let directory = self
            .directory
            .as_ref()
            .ok_or_else(|| DispatchError::Config("no directory configured".into()))?;
        self.validate(keys.len(), &message, delay)?;

        let mut resolved = Vec::with_capacity(keys.len());
        let mut lookup_failures = Vec::new();
        for key in keys {
            match directory.eligible_attributes(&key).await {
                Ok(attributes) => {
                    resolved.push(Recipient::new(key).with_attributes(attributes.unwrap_or_default()));
                }
                Err(err) => {
                    warn!(recipient = %key, error = %err, "directory lookup failed");
                    lookup_failures.push(Exclusion {
                        recipient: key,
                        reason: Ineligibility::LookupFailed {
                            error: err.to_string(),
                        },
                    });
                }
            }
        }

        let (accepted, mut excluded) = eligibility::partition(resolved, policy, self.registry.now());
        excluded.extend(lookup_failures);
        self.launch(accepted, excluded, message, policy, delay)
    }

    /// Snapshot of an operation.
    pub fn status(&self, id: &OperationId) -> Result<Operation, DispatchError> {
        self.registry.get(id)
    }

    /// Snapshots of every operation known to this process, oldest first.
    pub fn list(&self) -> Result<Vec<Operation>, DispatchError> {
        self.registry.list()
    }

    /// Request cancellation of a running operation. The executor stops
    /// before its next transport call. Returns `false` when the operation
    /// already finished.
    pub fn cancel(&self, id: &OperationId) -> Result<bool, DispatchError> {
        // The token outlives the terminal transition until the launch task
        // removes it, so the record decides.
        if self.registry.get(id)?.status.is_terminal() {
            return Ok(false);
        }
        let Some(token) = self.running.lock().get(id).cloned() else {
            return Ok(false);
        };
        token.cancel();
        info!(operation_id = %id, "cancellation requested");
        Ok(true)
    }

    /// Operations whose executor has not finished yet.
    #[must_use]
    pub fn active_operations(&self) -> usize {
        self.running.lock().len()
    }

    /// Whether the transport answers its connectivity probe.
    pub async fn transport_reachable(&self) -> bool {
        self.transport.check().await
    }

    fn validate(
        &self,
        count: usize,
        message: &Message,
        delay: Duration,
    ) -> Result<(), ValidationError> {
        let result = if count == 0 {
            Err(ValidationError::EmptyRecipients)
        } else if let Some(max) = self
            .config
            .recipient_caps
            .for_kind(message.kind)
            .filter(|max| count > *max)
        {
            Err(ValidationError::TooManyRecipients {
                kind: message.kind,
                count,
                max,
            })
        } else if delay > self.config.max_delay() {
            Err(ValidationError::DelayOutOfRange {
                requested: delay,
                max_secs: self.config.max_delay_secs,
            })
        } else if message.subject.trim().is_empty() {
            Err(ValidationError::EmptySubject)
        } else {
            Ok(())
        };
        result.inspect_err(|err| warn!(kind = %message.kind, error = %err, "submission rejected"))
    }

    fn launch(
        &self,
        accepted: Vec<Recipient>,
        excluded: Vec<Exclusion>,
        message: Message,
        policy: &EligibilityPolicy,
        delay: Duration,
    ) -> Result<Submission, DispatchError> {
        let operation = self.registry.create(message.kind, accepted.len())?;
        let id = operation.id.clone();
        info!(
            operation_id = %id,
            kind = %message.kind,
            accepted = accepted.len(),
            excluded = excluded.len(),
            "operation accepted"
        );

        if accepted.is_empty() {
            let report = self.finish_empty(&id, policy.empty_batch)?;
            let task = self.spawner.spawn(std::future::ready(report));
            return Ok(Submission {
                operation_id: id.clone(),
                accepted: 0,
                excluded,
                handle: OperationHandle::new(id, task),
            });
        }

        let cancel = CancellationToken::new();
        self.running.lock().insert(id.clone(), cancel.clone());

        let mut executor = OperationExecutor::new(self.registry.clone(), Arc::clone(&self.transport))
            .with_cancellation(cancel)
            .with_permits(Arc::clone(&self.permits))
            .with_max_recorded_errors(self.config.max_recorded_errors);
        if let Some(directory) = &self.directory {
            executor = executor.with_directory(Arc::clone(directory));
        }

        let count = accepted.len();
        let plan = ExecutionPlan {
            operation_id: id.clone(),
            recipients: accepted,
            message,
            delay,
        };
        let running = Arc::clone(&self.running);
        let task = self.spawner.spawn(async move {
            let report = executor.run(plan).await;
            running.lock().remove(&report.operation_id);
            report
        });

        Ok(Submission {
            operation_id: id.clone(),
            accepted: count,
            excluded,
            handle: OperationHandle::new(id, task),
        })
    }

    fn finish_empty(
        &self,
        id: &OperationId,
        outcome: EmptyBatch,
    ) -> Result<ExecutionReport, DispatchError> {
        let now = self.registry.now();
        match outcome {
            EmptyBatch::Complete => {
                let operation = self.registry.update(id, |op| {
                    op.start(now);
                    op.finish(now);
                })?;
                info!(operation_id = %id, "empty operation completed");
                Ok(ExecutionReport::from(&operation))
            }
            EmptyBatch::Fail => {
                self.registry.update(id, |op| op.start(now))?;
                warn!(operation_id = %id, "no eligible recipients");
                Ok(abort(&self.registry, id, "no eligible recipients"))
            }
        }
    }
}
