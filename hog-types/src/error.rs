//! Error types for memhog.

use std::fmt;
use thiserror::Error;

/// Errors that can end a memory-hog experiment.
#[derive(Debug, Error)]
pub enum ChaosError {
    /// No target could be resolved.
    #[error("target selection failed: {reason}")]
    TargetSelection {
        /// Why selection failed.
        reason: String,
    },

    /// Scheduling policy string is not `serial` or `parallel`.
    #[error("'{0}' sequence is not supported")]
    UnsupportedPolicy(String),

    /// Stress command failed for a reason other than an OOM kill.
    #[error("failed to stress memory of {target}: {reason}")]
    Injection {
        /// Target identity.
        target: String,
        /// Raw error text from the stress command.
        reason: String,
    },

    /// One or more kill commands failed.
    #[error("failed to revert chaos: [{}]", join_failures(.failures))]
    Revert {
        /// Every target that could not be reverted.
        failures: Vec<RevertFailure>,
    },

    /// Operator or process signal stopped the experiment.
    #[error("experiment is aborted")]
    Aborted {
        /// Target under supervision when the abort arrived, if any.
        target: Option<String>,
    },

    /// A probe failed before injection.
    #[error("probe failed in {phase} phase: {reason}")]
    Probe {
        /// Probe phase name.
        phase: String,
        /// Failure description.
        reason: String,
    },

    /// Stress parameters are invalid.
    #[error("invalid stress spec: {0}")]
    InvalidSpec(String),

    /// Experiment configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

/// A single failed revert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertFailure {
    /// Target identity.
    pub target: String,
    /// Output of the kill command or transport error text.
    pub reason: String,
}

impl fmt::Display for RevertFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.target, self.reason)
    }
}

fn join_failures(failures: &[RevertFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Stable classification of a [`ChaosError`], used as the persisted error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Target selection.
    TargetSelection,
    /// Anything without a dedicated code.
    Generic,
    /// Stress command failure.
    ChaosInject,
    /// Kill command failure.
    ChaosRevert,
    /// Operator abort.
    ExperimentAborted,
    /// Probe failure.
    Probe,
    /// Invalid configuration or stress spec.
    Config,
}

impl ErrorKind {
    /// Error code string written into the experiment result.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::TargetSelection => "TARGET_SELECTION_ERROR",
            ErrorKind::Generic => "GENERIC_ERROR",
            ErrorKind::ChaosInject => "CHAOS_INJECT_ERROR",
            ErrorKind::ChaosRevert => "CHAOS_REVERT_ERROR",
            ErrorKind::ExperimentAborted => "EXPERIMENT_ABORTED",
            ErrorKind::Probe => "PROBE_ERROR",
            ErrorKind::Config => "CONFIG_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl ChaosError {
    /// Build a revert error for a single target.
    pub fn revert(target: impl Into<String>, reason: impl Into<String>) -> Self {
        ChaosError::Revert {
            failures: vec![RevertFailure {
                target: target.into(),
                reason: reason.into(),
            }],
        }
    }

    /// Classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChaosError::TargetSelection { .. } => ErrorKind::TargetSelection,
            ChaosError::UnsupportedPolicy(_) => ErrorKind::Generic,
            ChaosError::Injection { .. } => ErrorKind::ChaosInject,
            ChaosError::Revert { .. } => ErrorKind::ChaosRevert,
            ChaosError::Aborted { .. } => ErrorKind::ExperimentAborted,
            ChaosError::Probe { .. } => ErrorKind::Probe,
            ChaosError::InvalidSpec(_) | ChaosError::Config(_) => ErrorKind::Config,
        }
    }

    /// Human-readable failing step, prefixed with the phase it happened in.
    pub fn fail_step(&self, phase: &str) -> String {
        format!("[{}]: {}", phase, self)
    }

    /// Returns true if this error represents an operator abort.
    pub fn is_aborted(&self) -> bool {
        matches!(self, ChaosError::Aborted { .. })
    }
}
