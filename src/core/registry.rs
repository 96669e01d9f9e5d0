//! Process-wide operation registry.
//!
//! The registry is the single source of truth for progress polling. It lives
//! for the lifetime of the process and is never persisted: operations in
//! flight at shutdown are lost. Storage sits behind [`OperationStore`] so the
//! executor logic does not depend on where records are kept.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::{DispatchError, IdGenerator, MessageKind, Operation, OperationId};
use crate::util::clock::Clock;

/// Attempts at drawing a fresh identifier before giving up.
const MAX_ID_ATTEMPTS: usize = 8;

/// Storage backend for operation records.
///
/// Implementations must hand out whole snapshots: a reader sees the record
/// either before or after a mutation, never halfway through one.
pub trait OperationStore: Send + Sync + 'static {
    /// Insert a new record. Returns `Ok(false)` when the id is already taken.
    fn insert(&self, operation: Operation) -> Result<bool, DispatchError>;

    /// Snapshot of a record.
    fn get(&self, id: &OperationId) -> Result<Option<Operation>, DispatchError>;

    /// Apply `mutate` atomically and return the resulting snapshot.
    fn update(
        &self,
        id: &OperationId,
        mutate: &mut dyn FnMut(&mut Operation),
    ) -> Result<Operation, DispatchError>;

    /// Snapshots of every record, in no particular order.
    fn list(&self) -> Result<Vec<Operation>, DispatchError>;

    /// Number of stored records.
    fn len(&self) -> usize;

    /// Whether the store holds no records.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Registry of operations keyed by identifier. Cheap to clone; clones share
/// the same store.
#[derive(Clone)]
pub struct OperationRegistry {
    store: Arc<dyn OperationStore>,
    ids: IdGenerator,
    clock: Arc<dyn Clock>,
}

impl OperationRegistry {
    /// Registry over an explicit store, id generator and clock.
    pub fn new(store: Arc<dyn OperationStore>, ids: IdGenerator, clock: Arc<dyn Clock>) -> Self {
        Self { store, ids, clock }
    }

    /// Create a pending operation for `total` recipients.
    pub fn create(&self, kind: MessageKind, total: usize) -> Result<Operation, DispatchError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let now = self.now();
            let operation = Operation::new(self.ids.next_id(now), kind, total, now);
            if self.store.insert(operation.clone())? {
                tracing::debug!(operation_id = %operation.id, total, "operation created");
                return Ok(operation);
            }
            tracing::debug!(operation_id = %operation.id, "identifier collision, regenerating");
        }
        Err(DispatchError::Store(
            "could not allocate a unique operation id".into(),
        ))
    }

    /// Current snapshot of an operation.
    pub fn get(&self, id: &OperationId) -> Result<Operation, DispatchError> {
        self.store
            .get(id)?
            .ok_or_else(|| DispatchError::NotFound(id.clone()))
    }

    /// All operations, oldest first.
    pub fn list(&self) -> Result<Vec<Operation>, DispatchError> {
        let mut operations = self.store.list()?;
        operations.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(operations)
    }

    /// Number of operations known to this process.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether no operation was created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Mutate a live operation. Terminal operations are frozen and reject
    /// the change with [`DispatchError::AlreadyTerminal`].
    pub(crate) fn update<F>(&self, id: &OperationId, mut mutate: F) -> Result<Operation, DispatchError>
    where
        F: FnMut(&mut Operation),
    {
        let mut frozen = false;
        let snapshot = self.store.update(id, &mut |operation: &mut Operation| {
            if operation.status.is_terminal() {
                frozen = true;
            } else {
                mutate(operation);
            }
        })?;
        if frozen {
            return Err(DispatchError::AlreadyTerminal(id.clone()));
        }
        Ok(snapshot)
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::OperationStatus;
    use crate::infra::store::in_memory_registry;

    #[test]
    fn test_create_and_get() {
        let registry = in_memory_registry("bulk_email");
        let created = registry.create(MessageKind::Invitation, 3).unwrap();

        let fetched = registry.get(&created.id).unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.status, OperationStatus::Pending);
        assert_eq!(fetched.total, 3);
        assert!(fetched.errors.is_empty());
        assert!(fetched.started_at.is_none());
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let registry = in_memory_registry("bulk_email");
        let err = registry
            .get(&OperationId::from("bulk_email_00000000_0"))
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotFound(_)));
    }

    #[test]
    fn test_terminal_operation_is_frozen() {
        let registry = in_memory_registry("bulk_email");
        let op = registry.create(MessageKind::Custom, 1).unwrap();
        let now = registry.now();

        registry.update(&op.id, |o| o.start(now)).unwrap();
        registry.update(&op.id, Operation::record_success).unwrap();
        registry.update(&op.id, |o| o.finish(now)).unwrap();

        let err = registry
            .update(&op.id, |o| o.record_failure("x@example.com", "late", 10))
            .unwrap_err();
        assert!(matches!(err, DispatchError::AlreadyTerminal(_)));

        let snapshot = registry.get(&op.id).unwrap();
        assert_eq!(snapshot.status, OperationStatus::Completed);
        assert_eq!(snapshot.sent_count, 1);
        assert_eq!(snapshot.failed_count, 0);
    }

    #[test]
    fn test_snapshots_are_detached() {
        let registry = in_memory_registry("bulk_email");
        let op = registry.create(MessageKind::Custom, 2).unwrap();

        let mut copy = registry.get(&op.id).unwrap();
        copy.sent_count = 2;

        assert_eq!(registry.get(&op.id).unwrap().sent_count, 0);
    }

    #[test]
    fn test_list_is_ordered_by_creation() {
        let registry = in_memory_registry("bulk_email");
        let first = registry.create(MessageKind::Custom, 1).unwrap();
        let second = registry.create(MessageKind::Custom, 1).unwrap();

        let listed = registry.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().any(|o| o.id == first.id));
        assert!(listed.iter().any(|o| o.id == second.id));
        assert!(listed[0].created_at <= listed[1].created_at);
    }
}
