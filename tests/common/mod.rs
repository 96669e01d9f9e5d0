//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bulk_notify::builders::OrchestratorBuilder;
use bulk_notify::config::DispatchConfig;
use bulk_notify::core::{
    Directory, DirectoryError, Operation, OperationId, OperationStatus, Orchestrator, Recipient,
    RecipientAttributes, Transport, TransportError,
};
use parking_lot::Mutex;
use tokio::sync::Semaphore;

// ============================================================================
// TRANSPORTS
// ============================================================================

/// Transport that fails for a fixed set of addresses and records every call
/// along with the tokio instant it happened at.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    failing: Arc<HashSet<String>>,
    calls: Arc<Mutex<Vec<(String, tokio::time::Instant)>>>,
    latency: Duration,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(keys: &[&str]) -> Self {
        Self {
            failing: Arc::new(keys.iter().map(|k| (*k).to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn call_instants(&self) -> Vec<tokio::time::Instant> {
        self.calls.lock().iter().map(|(_, at)| *at).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        recipient: &Recipient,
        _subject: &str,
        _body: &str,
    ) -> Result<(), TransportError> {
        self.calls
            .lock()
            .push((recipient.key.clone(), tokio::time::Instant::now()));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.failing.contains(&recipient.key) {
            Err(TransportError::Rejected("mailbox unavailable".into()))
        } else {
            Ok(())
        }
    }
}

/// Transport that panics on one address.
pub struct PanickingTransport {
    pub poison: String,
}

#[async_trait]
impl Transport for PanickingTransport {
    async fn send(
        &self,
        recipient: &Recipient,
        _subject: &str,
        _body: &str,
    ) -> Result<(), TransportError> {
        assert!(recipient.key != self.poison, "relay crashed on {}", recipient.key);
        Ok(())
    }
}

/// Transport whose sends block until the test opens the gate.
#[derive(Clone)]
pub struct GatedTransport {
    gate: Arc<Semaphore>,
}

impl GatedTransport {
    pub fn closed() -> Self {
        Self {
            gate: Arc::new(Semaphore::new(0)),
        }
    }

    pub fn open(&self, sends: usize) {
        self.gate.add_permits(sends);
    }
}

#[async_trait]
impl Transport for GatedTransport {
    async fn send(
        &self,
        _recipient: &Recipient,
        _subject: &str,
        _body: &str,
    ) -> Result<(), TransportError> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;
        permit.forget();
        Ok(())
    }
}

// ============================================================================
// DIRECTORIES
// ============================================================================

/// Directory whose lookups fail for one key.
pub struct FlakyDirectory {
    pub broken: String,
}

#[async_trait]
impl Directory for FlakyDirectory {
    async fn eligible_attributes(
        &self,
        key: &str,
    ) -> Result<Option<RecipientAttributes>, DirectoryError> {
        if key == self.broken {
            Err(DirectoryError("connection reset".into()))
        } else {
            Ok(None)
        }
    }
}

// ============================================================================
// HELPERS
// ============================================================================

pub fn orchestrator(transport: impl Transport) -> Orchestrator {
    orchestrator_with(transport, DispatchConfig::default())
}

pub fn orchestrator_with(transport: impl Transport, config: DispatchConfig) -> Orchestrator {
    bulk_notify::util::init_tracing();
    OrchestratorBuilder::new(config)
        .with_transport(transport)
        .build()
        .expect("orchestrator builds")
}

pub fn recipients(keys: &[&str]) -> Vec<Recipient> {
    keys.iter().map(|key| Recipient::new(*key)).collect()
}

pub fn numbered_recipients(count: usize) -> Vec<Recipient> {
    (1..=count)
        .map(|i| Recipient::new(format!("r{i}@example.com")))
        .collect()
}

pub fn verified(key: &str) -> Recipient {
    Recipient::new(key).with_attributes(RecipientAttributes {
        email_verified: true,
        ..RecipientAttributes::default()
    })
}

/// Poll until `predicate` holds, sleeping briefly between polls.
pub async fn wait_until<F>(orchestrator: &Orchestrator, id: &OperationId, predicate: F) -> Operation
where
    F: Fn(&Operation) -> bool,
{
    for _ in 0..500 {
        let operation = orchestrator.status(id).expect("operation exists");
        if predicate(&operation) {
            return operation;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("operation {id} never reached the expected state");
}

pub fn is_status(status: OperationStatus) -> impl Fn(&Operation) -> bool {
    move |operation| operation.status == status
}
