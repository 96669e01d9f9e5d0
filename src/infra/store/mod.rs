//! Operation store backends.

pub mod memory;

use std::sync::Arc;

use crate::core::{IdGenerator, OperationRegistry};
use crate::util::clock::SystemClock;

pub use memory::InMemoryOperationStore;

/// Empty registry over an [`InMemoryOperationStore`], using the system clock.
#[must_use]
pub fn in_memory_registry(prefix: impl Into<String>) -> OperationRegistry {
    OperationRegistry::new(
        Arc::new(InMemoryOperationStore::new()),
        IdGenerator::new(prefix),
        Arc::new(SystemClock),
    )
}
