//! Infrastructure adapters: operation stores, directories and transports.

pub mod directory;
pub mod store;
pub mod transport;

pub use directory::InMemoryDirectory;
pub use store::{in_memory_registry, InMemoryOperationStore};
pub use transport::LogTransport;
