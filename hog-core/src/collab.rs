//! Interfaces to the collaborators around the orchestrator.
//!
//! Target discovery, probes, event emission and result persistence live
//! outside the core. The core only sees these traits.

use crate::select::{pick_affected, pick_by_names};
use async_trait::async_trait;
use hog_types::{ChaosError, Instance, ResultStatus, TargetSelector};
use std::sync::Mutex;
use thiserror::Error;

/// Result persistence failure.
#[derive(Debug, Error)]
#[error("failed to persist result: {0}")]
pub struct PersistError(pub String);

/// Enumerates the instances an experiment may target.
#[async_trait]
pub trait TargetSource: Send + Sync {
    /// Resolve `selector` into an ordered instance list.
    async fn instances(&self, selector: &TargetSelector) -> Result<Vec<Instance>, ChaosError>;
}

/// Runs the configured health probes for a phase.
#[async_trait]
pub trait ProbeRunner: Send + Sync {
    /// Run every probe of `phase`; the first failure is returned.
    async fn run_probes(&self, phase: &str) -> Result<(), ChaosError>;
}

/// Emits audit events.
pub trait EventReporter: Send + Sync {
    /// Report `message` about `target_name`.
    fn report(&self, message: &str, target_name: &str);
}

/// Stores the experiment verdict.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Replace the current verdict.
    fn set_result_status(&self, status: ResultStatus);

    /// Write the current verdict out.
    async fn persist(&self) -> Result<(), PersistError>;
}

/// A fixed instance list, narrowed by name or percentage.
#[derive(Debug, Clone, Default)]
pub struct StaticTargetSource {
    instances: Vec<Instance>,
}

impl StaticTargetSource {
    /// Create a source over `instances`.
    pub fn new(instances: Vec<Instance>) -> Self {
        Self { instances }
    }
}

#[async_trait]
impl TargetSource for StaticTargetSource {
    async fn instances(&self, selector: &TargetSelector) -> Result<Vec<Instance>, ChaosError> {
        if !selector.names.is_empty() {
            return pick_by_names(&self.instances, &selector.names);
        }
        let mut rng = rand::thread_rng();
        Ok(pick_affected(
            self.instances.clone(),
            selector.affected_percentage,
            &mut rng,
        ))
    }
}

/// Keeps the verdict in memory; `persist` counts calls.
#[derive(Debug, Default)]
pub struct InMemoryResultStore {
    inner: Mutex<InMemoryResultInner>,
}

#[derive(Debug, Default)]
struct InMemoryResultInner {
    status: Option<ResultStatus>,
    persisted: Vec<ResultStatus>,
}

impl InMemoryResultStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The verdict currently set.
    pub fn current(&self) -> Option<ResultStatus> {
        self.inner.lock().ok().and_then(|inner| inner.status.clone())
    }

    /// Every verdict that was persisted, oldest first.
    pub fn persisted(&self) -> Vec<ResultStatus> {
        self.inner
            .lock()
            .map(|inner| inner.persisted.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ResultStore for InMemoryResultStore {
    fn set_result_status(&self, status: ResultStatus) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.status = Some(status);
        }
    }

    async fn persist(&self) -> Result<(), PersistError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| PersistError(e.to_string()))?;
        let status = inner
            .status
            .clone()
            .ok_or_else(|| PersistError("no result status set".into()))?;
        inner.persisted.push(status);
        Ok(())
    }
}

/// Reporter that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl EventReporter for LogReporter {
    fn report(&self, message: &str, target_name: &str) {
        tracing::info!(target_name, "{}", message);
    }
}
