//! Mock executor for testing.
//!
//! Scripts how each target's stress command behaves and records every call
//! for verification.

use super::{ExecError, ExecOutput, RemoteExecutor};
use async_trait::async_trait;
use hog_types::Target;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Exit status reported for a stress command stopped by the kill command.
const TERMINATED_EXIT_CODE: i64 = 143;

/// What the default kill command prints when no `dd` process is left.
const NOTHING_TO_KILL: &str = "kill: usage: kill [-s sigspec] pid";

/// How a target's stress command behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StressBehavior {
    /// Run until the kill command is executed against the same target.
    Hold,
    /// Exit with `exit_code` after `after`.
    Exit {
        /// Delay before exiting.
        after: Duration,
        /// Exit code to report.
        exit_code: i64,
    },
    /// Fail with a backend error after `after`.
    Error {
        /// Delay before failing.
        after: Duration,
        /// Error text.
        message: String,
    },
}

impl StressBehavior {
    /// Exit immediately with `exit_code`.
    pub fn exit(exit_code: i64) -> Self {
        StressBehavior::Exit {
            after: Duration::ZERO,
            exit_code,
        }
    }

    /// Fail immediately with a backend error.
    pub fn error(message: &str) -> Self {
        StressBehavior::Error {
            after: Duration::ZERO,
            message: message.to_string(),
        }
    }
}

/// Which command a recorded call carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// The `dd` stress command.
    Stress,
    /// Anything else (the kill command).
    Kill,
}

/// A recorded exec call.
#[derive(Debug, Clone)]
pub struct ExecCall {
    /// Target instance name.
    pub target: String,
    /// Container the call addressed.
    pub container: String,
    /// Command kind.
    pub kind: CallKind,
    /// When the call started.
    pub at: Instant,
}

/// Mock executor for testing and `--mock` runs.
///
/// Unscripted targets use [`StressBehavior::Hold`]. Once a scripted stress
/// command has exited, the kill command against that target exits 2 the way
/// the default kill command does when it finds no `dd`. Clones share state.
#[derive(Debug, Default)]
pub struct MockExecutor {
    inner: Arc<Mutex<MockExecutorInner>>,
}

#[derive(Debug, Default)]
struct MockExecutorInner {
    behaviors: HashMap<String, StressBehavior>,
    failing_kills: HashSet<String>,
    released: HashMap<String, Arc<Notify>>,
    exited: HashSet<String>,
    calls: Vec<ExecCall>,
}

impl MockExecutor {
    /// Create a new mock executor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the stress behaviour of one target.
    pub fn set_stress(&self, target_name: &str, behavior: StressBehavior) {
        let mut inner = self.inner.lock().unwrap();
        inner.behaviors.insert(target_name.to_string(), behavior);
    }

    /// Make every kill command against `target_name` exit non-zero.
    pub fn fail_kill(&self, target_name: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.failing_kills.insert(target_name.to_string());
    }

    /// All calls so far, in start order.
    pub fn calls(&self) -> Vec<ExecCall> {
        let inner = self.inner.lock().unwrap();
        inner.calls.clone()
    }

    /// Number of calls of `kind` made against `target_name`.
    pub fn call_count(&self, target_name: &str, kind: CallKind) -> usize {
        let inner = self.inner.lock().unwrap();
        inner
            .calls
            .iter()
            .filter(|c| c.target == target_name && c.kind == kind)
            .count()
    }

    fn release_handle(inner: &mut MockExecutorInner, target_name: &str) -> Arc<Notify> {
        inner
            .released
            .entry(target_name.to_string())
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }
}

impl Clone for MockExecutor {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn is_stress_command(command: &[String]) -> bool {
    command
        .last()
        .map_or(false, |script| script.trim_start().starts_with("dd "))
}

#[async_trait]
impl RemoteExecutor for MockExecutor {
    async fn exec(&self, target: &Target, command: &[String]) -> Result<ExecOutput, ExecError> {
        let kind = if is_stress_command(command) {
            CallKind::Stress
        } else {
            CallKind::Kill
        };

        // Decide under the lock, wait outside it.
        let (behavior, release) = {
            let mut inner = self.inner.lock().unwrap();
            inner.calls.push(ExecCall {
                target: target.name.clone(),
                container: target.container.clone(),
                kind,
                at: Instant::now(),
            });
            let release = Self::release_handle(&mut inner, &target.name);

            if kind == CallKind::Kill {
                if inner.failing_kills.contains(&target.name) {
                    return Ok(ExecOutput {
                        stdout: String::new(),
                        stderr: "kill: no such process".into(),
                        exit_code: Some(1),
                    });
                }
                if inner.exited.contains(&target.name) {
                    return Ok(ExecOutput {
                        stdout: String::new(),
                        stderr: NOTHING_TO_KILL.into(),
                        exit_code: Some(2),
                    });
                }
                release.notify_one();
                return Ok(ExecOutput::with_exit_code(0));
            }

            let behavior = inner
                .behaviors
                .get(&target.name)
                .cloned()
                .unwrap_or(StressBehavior::Hold);
            (behavior, release)
        };

        match behavior {
            StressBehavior::Hold => {
                release.notified().await;
                Ok(ExecOutput::with_exit_code(TERMINATED_EXIT_CODE))
            }
            StressBehavior::Exit { after, exit_code } => {
                tokio::time::sleep(after).await;
                self.inner
                    .lock()
                    .unwrap()
                    .exited
                    .insert(target.name.clone());
                Ok(ExecOutput {
                    stdout: String::new(),
                    stderr: if exit_code == 0 {
                        String::new()
                    } else {
                        format!("dd exited with status {}", exit_code)
                    },
                    exit_code: Some(exit_code),
                })
            }
            StressBehavior::Error { after, message } => {
                tokio::time::sleep(after).await;
                Err(ExecError::Backend(message))
            }
        }
    }
}
