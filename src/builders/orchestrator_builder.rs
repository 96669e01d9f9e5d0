//! Builder assembling an [`Orchestrator`] from configuration and collaborators.

use std::sync::Arc;

use crate::config::DispatchConfig;
use crate::core::{
    Directory, DispatchError, IdGenerator, OperationRegistry, OperationStore, Orchestrator,
    Transport,
};
use crate::infra::store::InMemoryOperationStore;
use crate::runtime::TokioSpawner;
use crate::util::clock::{Clock, SystemClock};

/// Builds an orchestrator. Only the transport is mandatory; the store
/// defaults to in-memory, the clock to the system clock and the spawner to
/// the current tokio runtime.
///
/// ```rust,ignore
/// let orchestrator = OrchestratorBuilder::new(DispatchConfig::from_env()?)
///     .with_transport(LogTransport::new())
///     .with_directory(InMemoryDirectory::new())
///     .build()?;
/// ```
pub struct OrchestratorBuilder {
    config: DispatchConfig,
    transport: Option<Arc<dyn Transport>>,
    directory: Option<Arc<dyn Directory>>,
    store: Option<Arc<dyn OperationStore>>,
    clock: Option<Arc<dyn Clock>>,
    spawner: Option<TokioSpawner>,
}

impl OrchestratorBuilder {
    /// Start from a configuration.
    #[must_use]
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            transport: None,
            directory: None,
            store: None,
            clock: None,
            spawner: None,
        }
    }

    /// Deliver through `transport`.
    #[must_use]
    pub fn with_transport(self, transport: impl Transport) -> Self {
        self.with_shared_transport(Arc::new(transport))
    }

    /// Deliver through a transport shared with the caller.
    #[must_use]
    pub fn with_shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Resolve keys and record invitations through `directory`.
    #[must_use]
    pub fn with_directory(self, directory: impl Directory) -> Self {
        self.with_shared_directory(Arc::new(directory))
    }

    /// Use a directory shared with the caller.
    #[must_use]
    pub fn with_shared_directory(mut self, directory: Arc<dyn Directory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Keep operations in `store`.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn OperationStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Read time from `clock`.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Spawn executors through `spawner`.
    #[must_use]
    pub fn with_spawner(mut self, spawner: TokioSpawner) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Validate the configuration and assemble the orchestrator.
    pub fn build(self) -> Result<Orchestrator, DispatchError> {
        self.config.validate().map_err(DispatchError::Config)?;
        let transport = self
            .transport
            .ok_or_else(|| DispatchError::Config("a transport is required".into()))?;
        let spawner = match self.spawner {
            Some(spawner) => spawner,
            None => TokioSpawner::current()?,
        };
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryOperationStore::new()));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let registry =
            OperationRegistry::new(store, IdGenerator::new(self.config.id_prefix.clone()), clock);
        tracing::debug!(
            id_prefix = %self.config.id_prefix,
            max_concurrent_operations = self.config.max_concurrent_operations,
            "orchestrator built"
        );
        Ok(Orchestrator::new(
            self.config,
            registry,
            transport,
            self.directory,
            spawner,
        ))
    }
}
