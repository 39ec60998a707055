//! Serial and parallel injection state machines.
//!
//! Each supervision loop arms a fresh full-duration timer per iteration and
//! races three events, abort first:
//!
//! ```text
//!             ┌──────────── report: Completed / OomKilled ───────────┐
//!             ▼                                                      │
//!   ──► [supervising] ── timer ──► revert ──► next target / done     │
//!             │  │                                                   │
//!             │  └──────────────────────────────────────────────────-┘
//!             ├── report: Failed ──► revert ──► InjectionError
//!             └── abort ───────────► revert ──► persist Stopped ──► Aborted
//! ```

use crate::collab::{EventReporter, LogReporter, ResultStore};
use crate::exec::RemoteExecutor;
use crate::revert::Reverter;
use crate::status::TargetStatusMap;
use crate::stress::{StressReport, StressRunner};
use hog_types::{
    ChaosError, InjectionOutcome, Instance, ResultStatus, RunResult, SchedulingPolicy, StressSpec,
    Target, TargetOutcome, TargetStatus,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Phase name recorded in results produced by the orchestrator.
pub const CHAOS_PHASE: &str = "ChaosInject";

/// Default wait before returning when an abort arrived before injection.
pub const DEFAULT_ABORT_GRACE: Duration = Duration::from_secs(10);

/// Pick the container every target of the run is exec'd into.
///
/// An explicit name wins. Otherwise the first container of the first
/// instance is used for all instances.
pub fn resolve_container(
    explicit: Option<&str>,
    instances: &[Instance],
) -> Result<String, ChaosError> {
    if let Some(name) = explicit.map(str::trim).filter(|n| !n.is_empty()) {
        return Ok(name.to_string());
    }
    let first = instances.first().ok_or_else(|| ChaosError::TargetSelection {
        reason: "no target instances to resolve a container from".into(),
    })?;
    first
        .first_container()
        .map(str::to_string)
        .ok_or_else(|| ChaosError::TargetSelection {
            reason: format!("instance {}/{} has no containers", first.namespace, first.name),
        })
}

/// Bind every instance to the resolved container.
pub fn bind_targets(instances: &[Instance], container: &str) -> Vec<Target> {
    instances
        .iter()
        .map(|i| Target::from_instance(i, container))
        .collect()
}

/// Drives one memory-hog run over a fixed target list.
pub struct Orchestrator {
    spec: StressSpec,
    runner: StressRunner,
    reverter: Reverter,
    status: Arc<TargetStatusMap>,
    abort: CancellationToken,
    results: Arc<dyn ResultStore>,
    events: Arc<dyn EventReporter>,
    abort_grace: Duration,
    experiment_name: String,
}

impl Orchestrator {
    /// Create an orchestrator with a fresh status map.
    pub fn new(
        executor: Arc<dyn RemoteExecutor>,
        spec: StressSpec,
        abort: CancellationToken,
        results: Arc<dyn ResultStore>,
    ) -> Self {
        Self::with_status_map(
            executor,
            spec,
            abort,
            results,
            Arc::new(TargetStatusMap::new()),
        )
    }

    /// Create an orchestrator that marks targets in `status`.
    pub fn with_status_map(
        executor: Arc<dyn RemoteExecutor>,
        spec: StressSpec,
        abort: CancellationToken,
        results: Arc<dyn ResultStore>,
        status: Arc<TargetStatusMap>,
    ) -> Self {
        Self {
            runner: StressRunner::new(executor.clone(), &spec),
            reverter: Reverter::new(executor, &spec, status.clone()),
            spec,
            status,
            abort,
            results,
            events: Arc::new(LogReporter),
            abort_grace: DEFAULT_ABORT_GRACE,
            experiment_name: "memory-hog-exec".into(),
        }
    }

    /// Set the event reporter.
    pub fn with_events(mut self, events: Arc<dyn EventReporter>) -> Self {
        self.events = events;
        self
    }

    /// Set the wait applied when an abort arrives before injection.
    pub fn with_abort_grace(mut self, grace: Duration) -> Self {
        self.abort_grace = grace;
        self
    }

    /// Set the experiment name used in events.
    pub fn with_experiment_name(mut self, name: &str) -> Self {
        self.experiment_name = name.to_string();
        self
    }

    /// The status map this orchestrator marks targets in.
    pub fn status_map(&self) -> Arc<TargetStatusMap> {
        self.status.clone()
    }

    /// Stress `targets` under `policy` and revert them.
    pub async fn run(
        &self,
        targets: &[Target],
        policy: SchedulingPolicy,
    ) -> Result<RunResult, ChaosError> {
        let mut result = RunResult::new();
        self.run_into(targets, policy, &mut result).await?;
        Ok(result)
    }

    /// Like [`Orchestrator::run`], but records into `result` so the outcomes
    /// seen before a failure survive it.
    pub async fn run_into(
        &self,
        targets: &[Target],
        policy: SchedulingPolicy,
        result: &mut RunResult,
    ) -> Result<(), ChaosError> {
        tracing::info!(
            policy = %policy,
            targets = targets.len(),
            memory_mb = self.spec.memory_mb,
            duration_secs = self.spec.chaos_duration_secs,
            "starting memory hog injection"
        );
        let outcome = match policy {
            SchedulingPolicy::Serial => self.run_serial(targets, result).await,
            SchedulingPolicy::Parallel => self.run_parallel(targets, result).await,
        };
        order_outcomes(result, targets);
        outcome
    }

    /// One target at a time; target N+1 starts after target N is reverted.
    async fn run_serial(
        &self,
        targets: &[Target],
        result: &mut RunResult,
    ) -> Result<(), ChaosError> {
        self.abort_before_start().await?;

        // Targets whose stress command exited on its own.
        let mut exited = HashSet::new();
        for target in targets {
            let (tx, mut rx) = mpsc::channel(1);
            self.inject(target, tx);

            tracing::info!("waiting for {}s", self.spec.chaos_duration_secs);
            let mut reported = false;
            loop {
                let window = tokio::time::sleep(self.spec.chaos_duration());
                tokio::select! {
                    biased;

                    _ = self.abort.cancelled() => {
                        let err = self
                            .abort_run(
                                std::slice::from_ref(target),
                                Some(target),
                                &exited,
                                result,
                            )
                            .await;
                        return Err(err);
                    }
                    report = rx.recv(), if !reported => {
                        reported = true;
                        if let Some(report) = report {
                            if let InjectionOutcome::Failed(reason) = report.outcome {
                                result.record(target, InjectionOutcome::Failed(reason.clone()));
                                self.reverter.revert(target).await?;
                                return Err(ChaosError::Injection {
                                    target: target.identity(),
                                    reason,
                                });
                            }
                            exited.insert(target.to_string());
                            result.record(target, report.outcome);
                        }
                    }
                    _ = window => {
                        tracing::info!(target_name = %target, "time is up for {}", self.experiment_name);
                        break;
                    }
                }
            }

            result.record_if_absent(target, InjectionOutcome::Completed);
            if exited.contains(&target.to_string()) {
                self.reverter.revert_exited(target).await;
            } else {
                self.reverter.revert(target).await?;
            }
            result.mark_reverted(target);
        }

        Ok(())
    }

    /// All targets at once, one shared window.
    async fn run_parallel(
        &self,
        targets: &[Target],
        result: &mut RunResult,
    ) -> Result<(), ChaosError> {
        self.abort_before_start().await?;

        // One slot per target so no runner blocks while we revert.
        let (tx, mut rx) = mpsc::channel(targets.len().max(1));
        for target in targets {
            self.inject(target, tx.clone());
        }
        drop(tx);

        tracing::info!("waiting for {}s", self.spec.chaos_duration_secs);
        let mut pending = targets.len();
        let mut exited = HashSet::new();
        loop {
            let window = tokio::time::sleep(self.spec.chaos_duration());
            tokio::select! {
                biased;

                _ = self.abort.cancelled() => {
                    let err = self.abort_run(targets, None, &exited, result).await;
                    return Err(err);
                }
                report = rx.recv(), if pending > 0 => match report {
                    Some(StressReport { target, outcome }) => {
                        pending -= 1;
                        if let InjectionOutcome::Failed(reason) = outcome {
                            result.record(&target, InjectionOutcome::Failed(reason.clone()));
                            self.reverter.revert_all(targets, &exited).await?;
                            return Err(ChaosError::Injection {
                                target: target.identity(),
                                reason,
                            });
                        }
                        exited.insert(target.to_string());
                        result.record(&target, outcome);
                    }
                    None => pending = 0,
                },
                _ = window => {
                    tracing::info!("time is up for {}", self.experiment_name);
                    break;
                }
            }
        }

        for target in targets {
            result.record_if_absent(target, InjectionOutcome::Completed);
        }

        self.reverter.revert_all(targets, &exited).await?;
        for target in targets {
            result.mark_reverted(target);
        }
        Ok(())
    }

    /// Start the stress command, mark the target injected, and announce it.
    fn inject(&self, target: &Target, tx: mpsc::Sender<StressReport>) {
        tracing::info!(
            target_name = %target,
            container = %target.container,
            memory_mb = self.spec.memory_mb,
            "target application details"
        );
        self.runner.spawn(target.clone(), tx);
        self.status.mark(&target.to_string(), TargetStatus::Injected);
        self.events.report(
            &format!(
                "Injecting {} chaos on {} instance",
                self.experiment_name, target.name
            ),
            &target.name,
        );
    }

    /// Abort observed before anything was injected.
    async fn abort_before_start(&self) -> Result<(), ChaosError> {
        if !self.abort.is_cancelled() {
            return Ok(());
        }
        tracing::warn!(
            "abort received before injection, stopping in {}s",
            self.abort_grace.as_secs()
        );
        tokio::time::sleep(self.abort_grace).await;
        let err = ChaosError::Aborted { target: None };
        self.record_stopped(&err, Vec::new()).await;
        Err(err)
    }

    /// Revert `injected`, persist a Stopped verdict, and build the error.
    async fn abort_run(
        &self,
        injected: &[Target],
        current: Option<&Target>,
        exited: &HashSet<String>,
        result: &mut RunResult,
    ) -> ChaosError {
        tracing::info!("revert started");
        for target in injected {
            result.record(target, InjectionOutcome::Aborted);
        }
        if let Err(e) = self.reverter.revert_all(injected, exited).await {
            tracing::error!("error in kill stress after abortion: {}", e);
        }

        let err = ChaosError::Aborted {
            target: current.map(Target::identity),
        };
        self.record_stopped(&err, result.outcomes.clone()).await;
        tracing::info!("revert completed");
        err
    }

    async fn record_stopped(&self, err: &ChaosError, outcomes: Vec<TargetOutcome>) {
        self.results
            .set_result_status(ResultStatus::from_error(CHAOS_PHASE, err, outcomes));
        if let Err(e) = self.results.persist().await {
            tracing::error!("failed to update chaos result: {}", e);
        }
    }
}

fn order_outcomes(result: &mut RunResult, targets: &[Target]) {
    let position = |key: &str| {
        targets
            .iter()
            .position(|t| t.to_string() == key)
            .unwrap_or(usize::MAX)
    };
    result.outcomes.sort_by_key(|o| position(&o.target));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::InMemoryResultStore;
    use crate::exec::{CallKind, MockExecutor, StressBehavior};
    use hog_types::Verdict;
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[derive(Default)]
    struct RecordingReporter {
        events: Mutex<Vec<(String, String)>>,
    }

    impl EventReporter for RecordingReporter {
        fn report(&self, message: &str, target_name: &str) {
            self.events
                .lock()
                .unwrap()
                .push((message.to_string(), target_name.to_string()));
        }
    }

    struct Fixture {
        exec: MockExecutor,
        results: Arc<InMemoryResultStore>,
        events: Arc<RecordingReporter>,
        abort: CancellationToken,
        orchestrator: Arc<Orchestrator>,
    }

    fn fixture(duration_secs: u64) -> Fixture {
        let exec = MockExecutor::new();
        let results = Arc::new(InMemoryResultStore::new());
        let events = Arc::new(RecordingReporter::default());
        let abort = CancellationToken::new();
        let orchestrator = Orchestrator::new(
            Arc::new(exec.clone()),
            StressSpec::new(256, duration_secs),
            abort.clone(),
            results.clone(),
        )
        .with_events(events.clone());
        Fixture {
            exec,
            results,
            events,
            abort,
            orchestrator: Arc::new(orchestrator),
        }
    }

    fn targets(names: &[&str]) -> Vec<Target> {
        names.iter().map(|n| Target::new("shop", n, "app")).collect()
    }

    fn transitions(f: &Fixture) -> Vec<(String, TargetStatus)> {
        f.orchestrator.status_map().transitions()
    }

    fn mark(name: &str, status: TargetStatus) -> (String, TargetStatus) {
        (format!("shop/{}", name), status)
    }

    // ===========================================
    // Container resolution
    // ===========================================

    #[test]
    fn explicit_container_wins() {
        let instances = vec![Instance::new("ns", "a", &["sidecar", "app"])];
        assert_eq!(resolve_container(Some("app"), &instances).unwrap(), "app");
    }

    #[test]
    fn default_container_is_first_of_first_instance() {
        let instances = vec![
            Instance::new("ns", "a", &["web", "sidecar"]),
            Instance::new("ns", "b", &["other"]),
        ];
        let container = resolve_container(None, &instances).unwrap();
        assert_eq!(container, "web");

        let bound = bind_targets(&instances, &container);
        assert!(bound.iter().all(|t| t.container == "web"));
    }

    #[test]
    fn blank_explicit_container_falls_back() {
        let instances = vec![Instance::new("ns", "a", &["web"])];
        assert_eq!(resolve_container(Some("  "), &instances).unwrap(), "web");
    }

    #[test]
    fn container_resolution_needs_a_container() {
        let err = resolve_container(None, &[Instance::new("ns", "a", &[])]).unwrap_err();
        assert!(matches!(err, ChaosError::TargetSelection { .. }));
        let err = resolve_container(None, &[]).unwrap_err();
        assert!(matches!(err, ChaosError::TargetSelection { .. }));
    }

    // ===========================================
    // Serial mode
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn serial_reverts_each_target_before_the_next() {
        let f = fixture(5);
        let started = Instant::now();

        let result = f
            .orchestrator
            .run(&targets(&["a", "b", "c"]), SchedulingPolicy::Serial)
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_secs(15));
        assert!(result.success());
        assert_eq!(result.reverted.len(), 3);
        assert_eq!(
            transitions(&f),
            vec![
                mark("a", TargetStatus::Injected),
                mark("a", TargetStatus::Reverted),
                mark("b", TargetStatus::Injected),
                mark("b", TargetStatus::Reverted),
                mark("c", TargetStatus::Injected),
                mark("c", TargetStatus::Reverted),
            ]
        );
        assert_eq!(f.events.events.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn serial_early_exit_rearms_full_window() {
        let f = fixture(5);
        f.exec.set_stress(
            "a",
            StressBehavior::Exit {
                after: Duration::from_secs(2),
                exit_code: 0,
            },
        );
        let started = Instant::now();

        let result = f
            .orchestrator
            .run(&targets(&["a"]), SchedulingPolicy::Serial)
            .await
            .unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(7));
        assert!(elapsed < Duration::from_secs(8));
        assert_eq!(
            result.outcome_of(&targets(&["a"])[0]),
            Some(&InjectionOutcome::Completed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn serial_oom_kill_moves_on_and_succeeds() {
        let f = fixture(5);
        f.exec.set_stress("a", StressBehavior::exit(137));

        let ts = targets(&["a", "b"]);
        let result = f
            .orchestrator
            .run(&ts, SchedulingPolicy::Serial)
            .await
            .unwrap();

        assert!(result.success());
        assert_eq!(result.outcome_of(&ts[0]), Some(&InjectionOutcome::OomKilled));
        assert_eq!(result.outcome_of(&ts[1]), Some(&InjectionOutcome::Completed));
        assert_eq!(f.exec.call_count("b", CallKind::Stress), 1);
        assert_eq!(result.reverted.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn serial_kill_after_stress_exit_does_not_fail_the_run() {
        let f = fixture(5);
        f.exec.set_stress("a", StressBehavior::exit(137));
        f.exec.set_stress(
            "b",
            StressBehavior::Exit {
                after: Duration::from_secs(1),
                exit_code: 0,
            },
        );

        let ts = targets(&["a", "b", "c"]);
        let result = f
            .orchestrator
            .run(&ts, SchedulingPolicy::Serial)
            .await
            .unwrap();

        assert!(result.success());
        assert_eq!(result.outcome_of(&ts[0]), Some(&InjectionOutcome::OomKilled));
        assert_eq!(result.outcome_of(&ts[1]), Some(&InjectionOutcome::Completed));
        for name in ["a", "b", "c"] {
            assert_eq!(f.exec.call_count(name, CallKind::Kill), 1);
            assert!(result.reverted.contains(&format!("shop/{name}")));
        }
        let status = f.orchestrator.status_map();
        assert_eq!(status.status("shop/a"), Some(TargetStatus::Reverted));
        assert_eq!(status.status("shop/b"), Some(TargetStatus::Reverted));
        assert!(status.still_injected().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn serial_stress_error_reverts_and_stops() {
        let f = fixture(5);
        f.exec
            .set_stress("b", StressBehavior::error("container is not running"));

        let err = f
            .orchestrator
            .run(&targets(&["a", "b", "c"]), SchedulingPolicy::Serial)
            .await
            .unwrap_err();

        match err {
            ChaosError::Injection { target, reason } => {
                assert!(target.contains("name: b"));
                assert!(reason.contains("container is not running"));
            }
            other => panic!("unexpected error: {other}"),
        }
        let status = f.orchestrator.status_map();
        assert_eq!(status.status("shop/a"), Some(TargetStatus::Reverted));
        assert_eq!(status.status("shop/b"), Some(TargetStatus::Reverted));
        assert_eq!(status.status("shop/c"), None);
        assert_eq!(f.exec.call_count("c", CallKind::Stress), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn serial_failed_revert_ends_the_run() {
        let f = fixture(1);
        f.exec.fail_kill("a");

        let err = f
            .orchestrator
            .run(&targets(&["a", "b"]), SchedulingPolicy::Serial)
            .await
            .unwrap_err();

        assert!(matches!(err, ChaosError::Revert { .. }));
        assert_eq!(f.exec.call_count("b", CallKind::Stress), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn serial_abort_reverts_current_and_starts_nothing_else() {
        let f = fixture(10);
        let orchestrator = f.orchestrator.clone();
        let run = tokio::spawn(async move {
            orchestrator
                .run(&targets(&["a", "b", "c"]), SchedulingPolicy::Serial)
                .await
        });

        tokio::time::sleep(Duration::from_secs(3)).await;
        f.abort.cancel();

        let err = run.await.unwrap().unwrap_err();
        assert!(matches!(err, ChaosError::Aborted { target: Some(ref t) } if t.contains("name: a")));
        assert_eq!(f.exec.call_count("a", CallKind::Kill), 1);
        assert_eq!(f.exec.call_count("b", CallKind::Stress), 0);
        assert_eq!(f.exec.call_count("c", CallKind::Stress), 0);

        let persisted = f.results.persisted();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].verdict, Verdict::Stopped);
        assert_eq!(persisted[0].outcomes.len(), 1);
        assert_eq!(persisted[0].outcomes[0].outcome, InjectionOutcome::Aborted);
    }

    // ===========================================
    // Parallel mode
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn parallel_injects_everything_before_any_revert() {
        let f = fixture(5);
        let started = Instant::now();

        let result = f
            .orchestrator
            .run(&targets(&["a", "b", "c"]), SchedulingPolicy::Parallel)
            .await
            .unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(5));
        assert!(elapsed < Duration::from_secs(6));
        assert!(result.success());

        let marks = transitions(&f);
        assert_eq!(marks.len(), 6);
        assert!(marks[..3].iter().all(|(_, s)| *s == TargetStatus::Injected));
        assert!(marks[3..].iter().all(|(_, s)| *s == TargetStatus::Reverted));
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_oom_kill_is_success() {
        let f = fixture(5);
        f.exec.set_stress("b", StressBehavior::exit(137));

        let ts = targets(&["a", "b", "c"]);
        let result = f
            .orchestrator
            .run(&ts, SchedulingPolicy::Parallel)
            .await
            .unwrap();

        assert!(result.success());
        assert_eq!(result.outcome_of(&ts[1]), Some(&InjectionOutcome::OomKilled));
        let order: Vec<_> = result.outcomes.iter().map(|o| o.target.as_str()).collect();
        assert_eq!(order, vec!["shop/a", "shop/b", "shop/c"]);
        assert_eq!(result.reverted.len(), 3);
        for name in ["a", "b", "c"] {
            assert_eq!(f.exec.call_count(name, CallKind::Kill), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_oom_text_fallback_is_success() {
        let f = fixture(5);
        f.exec.set_stress(
            "a",
            StressBehavior::error("command terminated with non-zero exit code: 137"),
        );

        let result = f
            .orchestrator
            .run(&targets(&["a", "b"]), SchedulingPolicy::Parallel)
            .await
            .unwrap();

        assert!(result.success());
        assert_eq!(result.reverted.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_kill_after_stress_exit_does_not_fail_the_run() {
        let f = fixture(5);
        f.exec.set_stress(
            "a",
            StressBehavior::Exit {
                after: Duration::from_secs(1),
                exit_code: 0,
            },
        );
        f.exec.set_stress("b", StressBehavior::exit(137));

        let ts = targets(&["a", "b", "c"]);
        let result = f
            .orchestrator
            .run(&ts, SchedulingPolicy::Parallel)
            .await
            .unwrap();

        assert!(result.success());
        assert_eq!(result.outcome_of(&ts[0]), Some(&InjectionOutcome::Completed));
        assert_eq!(result.outcome_of(&ts[1]), Some(&InjectionOutcome::OomKilled));
        assert_eq!(result.reverted.len(), 3);
        assert!(f.orchestrator.status_map().still_injected().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_revert_failure_on_running_target_still_fails() {
        let f = fixture(5);
        f.exec.set_stress("a", StressBehavior::exit(137));
        f.exec.fail_kill("b");

        let err = f
            .orchestrator
            .run(&targets(&["a", "b"]), SchedulingPolicy::Parallel)
            .await
            .unwrap_err();

        match err {
            ChaosError::Revert { failures } => {
                assert_eq!(failures.len(), 1);
                assert!(failures[0].target.contains("name: b"));
            }
            other => panic!("unexpected error: {other}"),
        }
        let status = f.orchestrator.status_map();
        assert_eq!(status.status("shop/a"), Some(TargetStatus::Reverted));
        assert_eq!(status.still_injected(), vec!["shop/b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn outcomes_before_a_failure_are_kept() {
        let f = fixture(5);
        f.exec.set_stress("a", StressBehavior::exit(137));
        f.exec.set_stress("b", StressBehavior::error("container is not running"));

        let ts = targets(&["a", "b", "c"]);
        let mut result = RunResult::new();
        let err = f
            .orchestrator
            .run_into(&ts, SchedulingPolicy::Serial, &mut result)
            .await
            .unwrap_err();

        assert!(matches!(err, ChaosError::Injection { .. }));
        assert_eq!(result.outcomes.len(), 2);
        assert_eq!(result.outcome_of(&ts[0]), Some(&InjectionOutcome::OomKilled));
        assert!(matches!(
            result.outcome_of(&ts[1]),
            Some(InjectionOutcome::Failed(_))
        ));
        assert!(result.reverted.contains("shop/a"));
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_stress_error_reverts_all() {
        let f = fixture(5);
        f.exec.set_stress(
            "c",
            StressBehavior::Error {
                after: Duration::from_secs(1),
                message: "OCI runtime exec failed".into(),
            },
        );

        let err = f
            .orchestrator
            .run(&targets(&["a", "b", "c"]), SchedulingPolicy::Parallel)
            .await
            .unwrap_err();

        assert!(matches!(err, ChaosError::Injection { .. }));
        let status = f.orchestrator.status_map();
        assert!(status.still_injected().is_empty());
        for name in ["a", "b", "c"] {
            assert_eq!(
                status.status(&format!("shop/{}", name)),
                Some(TargetStatus::Reverted)
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_revert_failures_are_aggregated() {
        let f = fixture(1);
        f.exec.fail_kill("a");
        f.exec.fail_kill("c");

        let err = f
            .orchestrator
            .run(&targets(&["a", "b", "c"]), SchedulingPolicy::Parallel)
            .await
            .unwrap_err();

        match err {
            ChaosError::Revert { failures } => assert_eq!(failures.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            f.orchestrator.status_map().status("shop/b"),
            Some(TargetStatus::Reverted)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_abort_reverts_every_target() {
        let f = fixture(30);
        let orchestrator = f.orchestrator.clone();
        let run = tokio::spawn(async move {
            orchestrator
                .run(&targets(&["a", "b"]), SchedulingPolicy::Parallel)
                .await
        });

        tokio::time::sleep(Duration::from_secs(4)).await;
        f.abort.cancel();

        let err = run.await.unwrap().unwrap_err();
        assert!(err.is_aborted());
        assert!(f.orchestrator.status_map().still_injected().is_empty());

        let persisted = f.results.persisted();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].verdict, Verdict::Stopped);
        assert!(persisted[0]
            .outcomes
            .iter()
            .all(|o| o.outcome == InjectionOutcome::Aborted));
    }

    // ===========================================
    // Abort before start
    // ===========================================

    #[tokio::test(start_paused = true)]
    async fn abort_before_start_injects_nothing() {
        for policy in [SchedulingPolicy::Serial, SchedulingPolicy::Parallel] {
            let f = fixture(5);
            f.abort.cancel();
            let started = Instant::now();

            let err = f
                .orchestrator
                .run(&targets(&["a", "b"]), policy)
                .await
                .unwrap_err();

            assert!(err.is_aborted());
            assert!(started.elapsed() >= DEFAULT_ABORT_GRACE);
            assert!(f.exec.calls().is_empty());
            assert!(f.orchestrator.status_map().is_empty());
            assert_eq!(f.results.persisted()[0].verdict, Verdict::Stopped);
        }
    }
}
