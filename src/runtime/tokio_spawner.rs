//! Tokio runtime spawner.

use std::future::Future;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::core::DispatchError;

/// Spawns executors onto a tokio runtime and hands back joinable handles.
#[derive(Debug, Clone)]
pub struct TokioSpawner {
    handle: Handle,
}

impl TokioSpawner {
    /// Spawner bound to an explicit runtime handle.
    #[must_use]
    pub const fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Spawner bound to the runtime the caller is running on.
    pub fn current() -> Result<Self, DispatchError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| DispatchError::Config(format!("no tokio runtime available: {e}")))
    }

    /// Spawn `fut` as an independent task.
    pub fn spawn<F>(&self, fut: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(fut)
    }
}
