//! In-memory operation store.
//!
//! Design:
//! - `RwLock` over the entry map (read-heavy; write only on insert)
//! - one `Mutex` per entry, so an executor updating its operation never
//!   contends with another operation's executor
//! - readers clone the record under the entry lock and get a whole snapshot

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::core::{DispatchError, Operation, OperationId, OperationStore};

/// Store keeping every record in process memory. Contents are discarded with
/// the process.
#[derive(Default)]
pub struct InMemoryOperationStore {
    entries: RwLock<HashMap<OperationId, Arc<Mutex<Operation>>>>,
}

impl InMemoryOperationStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, id: &OperationId) -> Option<Arc<Mutex<Operation>>> {
        self.entries.read().get(id).cloned()
    }
}

impl OperationStore for InMemoryOperationStore {
    fn insert(&self, operation: Operation) -> Result<bool, DispatchError> {
        let mut entries = self.entries.write();
        if entries.contains_key(&operation.id) {
            return Ok(false);
        }
        entries.insert(operation.id.clone(), Arc::new(Mutex::new(operation)));
        Ok(true)
    }

    fn get(&self, id: &OperationId) -> Result<Option<Operation>, DispatchError> {
        Ok(self.entry(id).map(|entry| entry.lock().clone()))
    }

    fn update(
        &self,
        id: &OperationId,
        mutate: &mut dyn FnMut(&mut Operation),
    ) -> Result<Operation, DispatchError> {
        let entry = self
            .entry(id)
            .ok_or_else(|| DispatchError::NotFound(id.clone()))?;
        let mut operation = entry.lock();
        mutate(&mut *operation);
        Ok(operation.clone())
    }

    fn list(&self) -> Result<Vec<Operation>, DispatchError> {
        let entries: Vec<_> = self.entries.read().values().cloned().collect();
        Ok(entries.iter().map(|entry| entry.lock().clone()).collect())
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::core::MessageKind;

    fn make_operation(id: &str) -> Operation {
        Operation::new(OperationId::from(id), MessageKind::Custom, 2, Utc::now())
    }

    #[test]
    fn test_duplicate_insert_is_refused() {
        let store = InMemoryOperationStore::new();
        assert!(store.insert(make_operation("op_1")).unwrap());
        assert!(!store.insert(make_operation("op_1")).unwrap());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_update_returns_post_mutation_snapshot() {
        let store = InMemoryOperationStore::new();
        store.insert(make_operation("op_1")).unwrap();

        let snapshot = store
            .update(&OperationId::from("op_1"), &mut |op: &mut Operation| op.sent_count += 1)
            .unwrap();
        assert_eq!(snapshot.sent_count, 1);
        assert_eq!(
            store.get(&OperationId::from("op_1")).unwrap().unwrap().sent_count,
            1
        );
    }

    #[test]
    fn test_update_unknown_id() {
        let store = InMemoryOperationStore::new();
        let result = store.update(&OperationId::from("missing"), &mut |_: &mut Operation| {});
        assert!(matches!(result, Err(DispatchError::NotFound(_))));
        assert!(store.is_empty());
    }
}
