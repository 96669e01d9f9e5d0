//! Runtime adapter and API surface.

pub mod api;
pub mod tokio_spawner;

pub use api::{
    health, list_operations, operation_status, operation_status_json, ExclusionResponse, Health,
    OperationStatusResponse, SubmissionResponse,
};
pub use tokio_spawner::TokioSpawner;
