//! One end-to-end memory-hog experiment.
//!
//! Selects targets, runs probes, waits out the ramp time, hands the targets
//! to the [`Orchestrator`] and records the verdict.

use crate::collab::{EventReporter, LogReporter, ProbeRunner, ResultStore, TargetSource};
use crate::config::Config;
use crate::exec::RemoteExecutor;
use crate::orchestrator::{bind_targets, resolve_container, Orchestrator, CHAOS_PHASE};
use crate::status::TargetStatusMap;
use hog_types::{ChaosError, ErrorKind, ResultStatus, RunResult, TargetSelector};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Phase probes are run in.
pub const PROBE_PHASE: &str = "DuringChaos";

/// Phase recorded for failures before any target was touched.
pub const PRE_CHAOS_PHASE: &str = "PreChaos";

/// Phase recorded for a passing experiment.
pub const COMPLETED_PHASE: &str = "Completed";

/// A configured experiment and its collaborators.
pub struct Experiment {
    config: Config,
    executor: Arc<dyn RemoteExecutor>,
    source: Arc<dyn TargetSource>,
    results: Arc<dyn ResultStore>,
    events: Arc<dyn EventReporter>,
    probes: Option<Arc<dyn ProbeRunner>>,
    status: Arc<TargetStatusMap>,
}

impl Experiment {
    /// Create an experiment with log-only events and no probes.
    pub fn new(
        config: Config,
        executor: Arc<dyn RemoteExecutor>,
        source: Arc<dyn TargetSource>,
        results: Arc<dyn ResultStore>,
    ) -> Self {
        Self {
            config,
            executor,
            source,
            results,
            events: Arc::new(LogReporter),
            probes: None,
            status: Arc::new(TargetStatusMap::new()),
        }
    }

    /// Set the event reporter.
    pub fn with_events(mut self, events: Arc<dyn EventReporter>) -> Self {
        self.events = events;
        self
    }

    /// Run `probes` once before injection.
    pub fn with_probes(mut self, probes: Arc<dyn ProbeRunner>) -> Self {
        self.probes = Some(probes);
        self
    }

    /// Status map targets are marked in.
    pub fn status_map(&self) -> Arc<TargetStatusMap> {
        self.status.clone()
    }

    /// Run the experiment and record its verdict.
    ///
    /// Aborted runs have already persisted a `Stopped` verdict by the time
    /// this returns; every other outcome is persisted here, failures with
    /// the per-target outcomes seen before them.
    pub async fn run(&self, abort: CancellationToken) -> Result<RunResult, ChaosError> {
        let mut result = RunResult::new();
        let outcome = self.execute(abort, &mut result).await;

        let left = self.status.still_injected();
        if !left.is_empty() {
            tracing::warn!(targets = ?left, "targets were not reverted");
        }

        match outcome {
            Ok(()) => {
                tracing::info!(targets = result.outcomes.len(), "experiment passed");
                self.record(ResultStatus::passed(COMPLETED_PHASE, &result))
                    .await;
                Ok(result)
            }
            Err(err) if err.is_aborted() => Err(err),
            Err(err) => {
                tracing::error!(error = %err, code = err.kind().code(), "experiment failed");
                self.record(ResultStatus::from_error(
                    phase_of(&err),
                    &err,
                    result.outcomes,
                ))
                .await;
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        abort: CancellationToken,
        result: &mut RunResult,
    ) -> Result<(), ChaosError> {
        let spec = self.config.stress_spec();
        spec.validate()?;

        let selector = self.config.selector();
        let instances = self.select(&selector).await?;
        let names: Vec<&str> = instances.iter().map(|i| i.name.as_str()).collect();
        tracing::info!("target instances list for chaos: {:?}", names);

        let container =
            resolve_container(self.config.experiment.target_container.as_deref(), &instances)?;
        let targets = bind_targets(&instances, &container);
        let policy = self.config.policy()?;

        if let Some(probes) = &self.probes {
            probes.run_probes(PROBE_PHASE).await?;
        }

        let ramp = self.config.ramp_time();
        if !ramp.is_zero() {
            tracing::info!("waiting for the ramp time of {}s before injecting chaos", ramp.as_secs());
            ramp_sleep(ramp, &abort).await;
        }

        let orchestrator = Orchestrator::with_status_map(
            self.executor.clone(),
            spec,
            abort.clone(),
            self.results.clone(),
            self.status.clone(),
        )
        .with_events(self.events.clone())
        .with_abort_grace(self.config.abort_grace())
        .with_experiment_name(&self.config.experiment.name);

        orchestrator.run_into(&targets, policy, result).await?;

        if !ramp.is_zero() {
            tracing::info!("waiting for the ramp time of {}s after injecting chaos", ramp.as_secs());
            ramp_sleep(ramp, &abort).await;
        }

        Ok(())
    }

    async fn select(
        &self,
        selector: &TargetSelector,
    ) -> Result<Vec<hog_types::Instance>, ChaosError> {
        if selector.is_empty() {
            return Err(ChaosError::TargetSelection {
                reason: "provide one of the target names or a label selector".into(),
            });
        }
        let instances = self.source.instances(selector).await?;
        if instances.is_empty() {
            return Err(ChaosError::TargetSelection {
                reason: "no target instances found".into(),
            });
        }
        Ok(instances)
    }

    async fn record(&self, status: ResultStatus) {
        self.results.set_result_status(status);
        if let Err(e) = self.results.persist().await {
            tracing::error!("failed to update chaos result: {}", e);
        }
    }
}

fn phase_of(err: &ChaosError) -> &'static str {
    match err.kind() {
        ErrorKind::TargetSelection | ErrorKind::Probe | ErrorKind::Config | ErrorKind::Generic => {
            PRE_CHAOS_PHASE
        }
        _ => CHAOS_PHASE,
    }
}

/// Sleep for `ramp`, returning early on abort.
async fn ramp_sleep(ramp: Duration, abort: &CancellationToken) {
    tokio::select! {
        _ = tokio::time::sleep(ramp) => {}
        _ = abort.cancelled() => {
            tracing::warn!("abort received during ramp time");
        }
    }
}
