//! Stress command launcher.
//!
//! One [`StressRunner::spawn`] call runs the `dd` stress inside one target on
//! its own task and sends exactly one [`StressReport`] when it finishes.

use crate::exec::{ExecError, ExecOutput, RemoteExecutor};
use hog_types::{InjectionOutcome, StressSpec, Target, OOM_EXIT_CODE};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Completion report of one stress invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StressReport {
    /// Target the stress ran in.
    pub target: Target,
    /// Classified outcome.
    pub outcome: InjectionOutcome,
}

/// Classify the result of a stress command.
///
/// A structured exit code wins. Backend errors without one fall back to
/// looking for `137` in the error text.
pub fn classify(result: &Result<ExecOutput, ExecError>) -> InjectionOutcome {
    match result {
        Ok(output) => match output.exit_code {
            None | Some(0) => InjectionOutcome::Completed,
            Some(OOM_EXIT_CODE) => InjectionOutcome::OomKilled,
            Some(code) => InjectionOutcome::Failed(format!(
                "stress command exited with code {}: {}",
                code,
                output.message()
            )),
        },
        Err(err) => {
            let text = err.to_string();
            if text.contains(&OOM_EXIT_CODE.to_string()) {
                InjectionOutcome::OomKilled
            } else {
                InjectionOutcome::Failed(text)
            }
        }
    }
}

/// Launches stress commands without blocking the caller.
#[derive(Clone)]
pub struct StressRunner {
    executor: Arc<dyn RemoteExecutor>,
    command: Vec<String>,
    memory_mb: u32,
}

impl StressRunner {
    /// Create a runner for the given spec.
    pub fn new(executor: Arc<dyn RemoteExecutor>, spec: &StressSpec) -> Self {
        Self {
            executor,
            command: spec.stress_command(),
            memory_mb: spec.memory_mb,
        }
    }

    /// Start the stress command inside `target` and report on `tx`.
    ///
    /// A closed channel is not an error: the orchestrator stops listening
    /// once a target's window is over.
    pub fn spawn(&self, target: Target, tx: mpsc::Sender<StressReport>) -> JoinHandle<()> {
        let executor = self.executor.clone();
        let command = self.command.clone();
        let memory_mb = self.memory_mb;

        tokio::spawn(async move {
            tracing::info!(
                target_name = %target,
                container = %target.container,
                memory_mb,
                "starting memory stress"
            );
            let result = executor.exec(&target, &command).await;
            let outcome = classify(&result);
            match &outcome {
                InjectionOutcome::OomKilled => {
                    tracing::warn!(target_name = %target, "chaos process OOM killed")
                }
                InjectionOutcome::Failed(reason) => {
                    tracing::error!(target_name = %target, %reason, "stress command failed")
                }
                _ => tracing::debug!(target_name = %target, "stress command finished"),
            }

            if tx.send(StressReport { target, outcome }).await.is_err() {
                tracing::debug!("stress report dropped, orchestrator no longer listening");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{MockExecutor, StressBehavior};

    #[test]
    fn structured_exit_codes() {
        assert_eq!(
            classify(&Ok(ExecOutput::with_exit_code(0))),
            InjectionOutcome::Completed
        );
        assert_eq!(
            classify(&Ok(ExecOutput::with_exit_code(137))),
            InjectionOutcome::OomKilled
        );
        assert!(matches!(
            classify(&Ok(ExecOutput::with_exit_code(1))),
            InjectionOutcome::Failed(_)
        ));
    }

    #[test]
    fn unknown_exit_code_is_completion() {
        assert_eq!(
            classify(&Ok(ExecOutput::default())),
            InjectionOutcome::Completed
        );
    }

    #[test]
    fn error_text_fallback() {
        let oom = Err(ExecError::Backend(
            "command terminated with non-zero exit code: exit code 137".into(),
        ));
        assert_eq!(classify(&oom), InjectionOutcome::OomKilled);

        let other = Err(ExecError::Backend("container is not running".into()));
        assert_eq!(
            classify(&other),
            InjectionOutcome::Failed("exec failed: container is not running".into())
        );
    }

    #[test]
    fn structured_code_beats_text() {
        // 137 in stderr but the structured code says otherwise.
        let out = ExecOutput {
            stdout: String::new(),
            stderr: "wrote 137 blocks".into(),
            exit_code: Some(2),
        };
        assert!(matches!(classify(&Ok(out)), InjectionOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn spawn_reports_once() {
        let exec = MockExecutor::new();
        exec.set_stress("a", StressBehavior::exit(137));
        let runner = StressRunner::new(Arc::new(exec.clone()), &StressSpec::new(128, 5));
        let (tx, mut rx) = mpsc::channel(1);

        let target = Target::new("ns", "a", "app");
        runner.spawn(target.clone(), tx).await.unwrap();

        let report = rx.recv().await.unwrap();
        assert_eq!(report.target, target);
        assert_eq!(report.outcome, InjectionOutcome::OomKilled);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn closed_channel_does_not_panic() {
        let exec = MockExecutor::new();
        exec.set_stress("a", StressBehavior::exit(0));
        let runner = StressRunner::new(Arc::new(exec), &StressSpec::new(128, 5));
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        runner
            .spawn(Target::new("ns", "a", "app"), tx)
            .await
            .expect("task should finish cleanly");
    }
}
