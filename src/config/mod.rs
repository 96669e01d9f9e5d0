//! Configuration models for the orchestrator.

pub mod dispatch;

pub use dispatch::{DispatchConfig, RecipientCaps, ENV_PREFIX, MAX_COOLDOWN_SECS, MAX_DELAY_SECS};
