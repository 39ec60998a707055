//! Per-target outcomes and the aggregate experiment result.

use crate::{ChaosError, Target};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Result of one stress invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum InjectionOutcome {
    /// Stress ran until the window closed or exited cleanly.
    Completed,
    /// Stress process was OOM killed (exit 137). The fault worked.
    OomKilled,
    /// Stress command failed for another reason.
    Failed(String),
    /// The run was aborted while this target was injected.
    Aborted,
}

impl InjectionOutcome {
    /// Returns true for outcomes that end the run with an error.
    pub fn is_failure(&self) -> bool {
        matches!(self, InjectionOutcome::Failed(_))
    }
}

/// Outcome attached to a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetOutcome {
    /// Target in `namespace/name` form.
    pub target: String,
    /// What happened.
    #[serde(flatten)]
    pub outcome: InjectionOutcome,
}

/// Aggregate result of one orchestrator run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// Outcomes in the order targets were injected.
    pub outcomes: Vec<TargetOutcome>,
    /// Targets whose kill command succeeded.
    pub reverted: BTreeSet<String>,
}

impl RunResult {
    /// Create an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or replace the outcome of a target.
    pub fn record(&mut self, target: &Target, outcome: InjectionOutcome) {
        let key = target.to_string();
        match self.outcomes.iter_mut().find(|o| o.target == key) {
            Some(existing) => existing.outcome = outcome,
            None => self.outcomes.push(TargetOutcome {
                target: key,
                outcome,
            }),
        }
    }

    /// Record `outcome` only if the target has none yet.
    pub fn record_if_absent(&mut self, target: &Target, outcome: InjectionOutcome) {
        if self.outcome_of(target).is_none() {
            self.record(target, outcome);
        }
    }

    /// Look up the outcome of a target.
    pub fn outcome_of(&self, target: &Target) -> Option<&InjectionOutcome> {
        let key = target.to_string();
        self.outcomes
            .iter()
            .find(|o| o.target == key)
            .map(|o| &o.outcome)
    }

    /// Remember a successful revert.
    pub fn mark_reverted(&mut self, target: &Target) {
        self.reverted.insert(target.to_string());
    }

    /// Returns true if no target failed.
    pub fn success(&self) -> bool {
        !self.outcomes.iter().any(|o| o.outcome.is_failure())
    }
}

/// Final verdict of an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Fault injected and reverted.
    Pass,
    /// Experiment failed.
    Fail,
    /// Experiment was aborted.
    Stopped,
}

/// Verdict record handed to the result collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultStatus {
    /// Final verdict.
    pub verdict: Verdict,
    /// Phase the experiment was in when the verdict was reached.
    pub phase: String,
    /// Failing step description, empty on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_step: Option<String>,
    /// Error code, empty on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Per-target outcomes known at verdict time.
    #[serde(default)]
    pub outcomes: Vec<TargetOutcome>,
}

impl ResultStatus {
    /// Successful experiment.
    pub fn passed(phase: &str, result: &RunResult) -> Self {
        Self {
            verdict: Verdict::Pass,
            phase: phase.to_string(),
            fail_step: None,
            error_code: None,
            outcomes: result.outcomes.clone(),
        }
    }

    /// Failed or stopped experiment, depending on the error.
    pub fn from_error(phase: &str, err: &ChaosError, outcomes: Vec<TargetOutcome>) -> Self {
        let verdict = if err.is_aborted() {
            Verdict::Stopped
        } else {
            Verdict::Fail
        };
        Self {
            verdict,
            phase: phase.to_string(),
            fail_step: Some(err.fail_step(phase)),
            error_code: Some(err.kind().code().to_string()),
            outcomes,
        }
    }
}
