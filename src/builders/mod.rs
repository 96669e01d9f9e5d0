//! Builders to construct orchestrators from configuration.

pub mod orchestrator_builder;

pub use orchestrator_builder::OrchestratorBuilder;
