//! # Bulk Notify
//!
//! A bulk-notification orchestrator: dispatch invitation, announcement or
//! custom emails to a batch of recipients without blocking the caller, then
//! poll a stable operation identifier to follow progress.
//!
//! ## Core Problem Solved
//!
//! Sending a few hundred emails through a throttled mail provider takes
//! minutes. Callers (typically an HTTP handler) need to:
//!
//! - **Return immediately** with something they can poll later
//! - **Skip recipients** who should not be contacted again (already verified,
//!   onboarded, or invited too recently)
//! - **Pace delivery** so the provider does not throttle the batch
//! - **Survive partial failure**: one bad address must not sink the batch
//!
//! ## Key Features
//!
//! - **Eligibility filtering**: pure, clock-driven policy evaluated once per
//!   recipient at submission time
//! - **Pollable operations**: `pending → in_progress → completed | failed`,
//!   with counts, derived progress and an ordered error log
//! - **Per-operation rate limiting**: a fixed delay between sends that never
//!   blocks other operations
//! - **Cooperative cancellation** and a bound on concurrently running batches
//! - **Pluggable seams**: `Transport`, `Directory` and `OperationStore` traits
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::time::Duration;
//!
//! use bulk_notify::builders::OrchestratorBuilder;
//! use bulk_notify::config::DispatchConfig;
//! use bulk_notify::core::{Message, Recipient};
//! use bulk_notify::infra::LogTransport;
//!
//! let orchestrator = OrchestratorBuilder::new(DispatchConfig::default())
//!     .with_transport(LogTransport::new())
//!     .build()?;
//!
//! let submission = orchestrator.submit(
//!     vec![Recipient::new("ada@example.com"), Recipient::new("alan@example.com")],
//!     Message::invitation("Welcome aboard", "<p>Your course is ready.</p>"),
//!     &orchestrator.default_policy(),
//!     Duration::from_millis(500),
//! )?;
//!
//! // later, from any task
//! let snapshot = orchestrator.status(&submission.operation_id)?;
//! println!("{}% done", snapshot.progress_percentage());
//! ```
//!
//! Operations live in process memory only. A restart discards every record,
//! including operations still in flight.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core dispatch abstractions: eligibility, registry, executor, orchestrator.
pub mod core;
/// Configuration models and validation.
pub mod config;
/// Builders to construct an orchestrator from configuration.
pub mod builders;
/// Infrastructure adapters for stores, directories and transports.
pub mod infra;
/// Tokio runtime adapter and API surface.
pub mod runtime;
/// Shared utilities.
pub mod util;
