//! Core dispatch abstractions: eligibility, identifiers, the operation
//! registry, the executor state machine and the orchestrator facade.

pub mod collaborator;
pub mod eligibility;
pub mod error;
pub mod executor;
pub mod id;
pub mod message;
pub mod operation;
pub mod orchestrator;
pub mod rate_limiter;
pub mod registry;

pub use collaborator::{Directory, Transport};
pub use eligibility::{
    evaluate, partition, Eligibility, EligibilityPolicy, EmptyBatch, Exclusion, Ineligibility,
    Recipient, RecipientAttributes,
};
pub use error::{AppResult, DirectoryError, DispatchError, TransportError, ValidationError};
pub use executor::{ExecutionPlan, ExecutionReport, OperationExecutor, OperationHandle};
pub use id::{IdGenerator, OperationId};
pub use message::{Message, MessageKind};
pub use operation::{FailureRecord, Operation, OperationStatus};
pub use orchestrator::{Orchestrator, Submission};
pub use rate_limiter::RateLimiter;
pub use registry::{OperationRegistry, OperationStore};
