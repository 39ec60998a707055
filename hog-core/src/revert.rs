//! Kill-command issuer.
//!
//! Triggered by the end of the chaos window, a stress failure, or an abort.

use crate::exec::RemoteExecutor;
use crate::status::TargetStatusMap;
use hog_types::{ChaosError, StressSpec, Target, TargetStatus};
use std::collections::HashSet;
use std::sync::Arc;

/// Runs the kill command against targets and marks them reverted.
#[derive(Clone)]
pub struct Reverter {
    executor: Arc<dyn RemoteExecutor>,
    command: Vec<String>,
    status: Arc<TargetStatusMap>,
}

impl Reverter {
    /// Create a reverter for the given spec.
    pub fn new(
        executor: Arc<dyn RemoteExecutor>,
        spec: &StressSpec,
        status: Arc<TargetStatusMap>,
    ) -> Self {
        Self {
            executor,
            command: spec.kill_command_argv(),
            status,
        }
    }

    /// Kill the stress process in one target.
    ///
    /// Safe to call when the stress process already exited; whether the kill
    /// command then succeeds is up to the command itself.
    pub async fn revert(&self, target: &Target) -> Result<(), ChaosError> {
        tracing::info!(target_name = %target, container = %target.container, "reverting memory stress");

        let output = self
            .executor
            .exec(target, &self.command)
            .await
            .map_err(|e| ChaosError::revert(target.identity(), e.to_string()))?;

        if !output.success() {
            return Err(ChaosError::revert(target.identity(), output.message()));
        }

        self.status.mark(&target.to_string(), TargetStatus::Reverted);
        Ok(())
    }

    /// Kill the stress process in a target whose stress command already
    /// exited.
    ///
    /// The kill command usually finds no `dd` left there and exits non-zero,
    /// so a failure is logged and the target is marked reverted anyway.
    pub async fn revert_exited(&self, target: &Target) {
        if let Err(err) = self.revert(target).await {
            tracing::warn!(
                target_name = %target,
                error = %err,
                "kill command failed after the stress command exited"
            );
            self.status.mark(&target.to_string(), TargetStatus::Reverted);
        }
    }

    /// Kill the stress process in every target.
    ///
    /// Every target is attempted; failures are combined into one error.
    /// Targets listed in `exited` (by `namespace/name`) go through
    /// [`Reverter::revert_exited`] and never contribute a failure.
    pub async fn revert_all(
        &self,
        targets: &[Target],
        exited: &HashSet<String>,
    ) -> Result<(), ChaosError> {
        let mut failures = Vec::new();
        for target in targets {
            if exited.contains(&target.to_string()) {
                self.revert_exited(target).await;
                continue;
            }
            if let Err(err) = self.revert(target).await {
                tracing::error!(target_name = %target, error = %err, "revert failed");
                if let ChaosError::Revert { failures: mut f } = err {
                    failures.append(&mut f);
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ChaosError::Revert { failures })
        }
    }
}
