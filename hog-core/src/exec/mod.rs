//! Remote execution abstraction for memhog.
//!
//! The orchestrator never talks to a container runtime directly. It goes
//! through [`RemoteExecutor`], which runs one command inside one target and
//! returns its output.
//!
//! # Design
//!
//! - A command that ran to completion is `Ok(ExecOutput)`, whatever its exit
//!   code. Backends that know the exit code report it in `exit_code`.
//! - `Err(ExecError)` means the backend could not run or follow the command.
//!   Its text may still carry an exit code; classification falls back to it.

mod mock;

pub use mock::{CallKind, ExecCall, MockExecutor, StressBehavior};

use async_trait::async_trait;
use hog_types::Target;
use thiserror::Error;

/// Remote execution errors.
#[derive(Debug, Clone, Error)]
pub enum ExecError {
    /// The backend failed to run or follow the command.
    #[error("exec failed: {0}")]
    Backend(String),

    /// The target does not exist.
    #[error("target not found: {0}")]
    TargetNotFound(String),
}

/// Output of a command that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
    /// Exit code, when the backend reports one.
    pub exit_code: Option<i64>,
}

impl ExecOutput {
    /// Output with a known exit code and no captured streams.
    pub fn with_exit_code(exit_code: i64) -> Self {
        Self {
            exit_code: Some(exit_code),
            ..Default::default()
        }
    }

    /// Returns true unless the backend reported a non-zero exit code.
    pub fn success(&self) -> bool {
        self.exit_code.map_or(true, |code| code == 0)
    }

    /// Most useful text for an error report: stderr, else stdout.
    pub fn message(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }
}

/// Runs commands inside remote targets.
///
/// Implementations handle the underlying runtime (Docker exec, mock, etc).
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Run `command` inside `target` and wait for it to finish.
    async fn exec(&self, target: &Target, command: &[String]) -> Result<ExecOutput, ExecError>;
}
