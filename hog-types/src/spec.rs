//! Stress parameters and scheduling policy.

use crate::ChaosError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Exit status of a process killed by SIGKILL, which is what the
/// out-of-memory killer sends.
pub const OOM_EXIT_CODE: i64 = 137;

/// Kill command that terminates the first `dd` process found in the container.
pub const DEFAULT_KILL_COMMAND: &str = "kill $(find /proc -name exe -lname '*/dd' 2>&1 | grep -v 'Permission denied' | awk -F/ '{print $(NF-1)}' | head -n 1)";

/// What to run and for how long.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StressSpec {
    /// Memory to consume per target, in megabytes.
    pub memory_mb: u32,
    /// Shell command that stops the stress process.
    pub kill_command: String,
    /// Length of each supervision window, in seconds.
    pub chaos_duration_secs: u64,
}

impl StressSpec {
    /// Create a spec with the default kill command.
    pub fn new(memory_mb: u32, chaos_duration_secs: u64) -> Self {
        Self {
            memory_mb,
            kill_command: DEFAULT_KILL_COMMAND.to_string(),
            chaos_duration_secs,
        }
    }

    /// Replace the kill command.
    pub fn with_kill_command(mut self, command: &str) -> Self {
        self.kill_command = command.to_string();
        self
    }

    /// Supervision window as a [`Duration`].
    pub fn chaos_duration(&self) -> Duration {
        Duration::from_secs(self.chaos_duration_secs)
    }

    /// The `dd` invocation that allocates `memory_mb` and streams through it.
    pub fn stress_script(&self) -> String {
        format!("dd if=/dev/zero of=/dev/null bs={}M", self.memory_mb)
    }

    /// Stress command argv, wrapped in `/bin/sh -c`.
    pub fn stress_command(&self) -> Vec<String> {
        shell(&self.stress_script())
    }

    /// Kill command argv, wrapped in `/bin/sh -c`.
    pub fn kill_command_argv(&self) -> Vec<String> {
        shell(&self.kill_command)
    }

    /// Reject specs that cannot produce a meaningful experiment.
    pub fn validate(&self) -> Result<(), ChaosError> {
        if self.memory_mb == 0 {
            return Err(ChaosError::InvalidSpec(
                "memory consumption must be a positive number of MB".into(),
            ));
        }
        if self.kill_command.trim().is_empty() {
            return Err(ChaosError::InvalidSpec("kill command is empty".into()));
        }
        Ok(())
    }
}

fn shell(script: &str) -> Vec<String> {
    vec!["/bin/sh".into(), "-c".into(), script.into()]
}

/// Order in which targets are stressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulingPolicy {
    /// One target at a time, in enumeration order.
    Serial,
    /// All targets at once, sharing a single window.
    Parallel,
}

impl SchedulingPolicy {
    /// Get the policy as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulingPolicy::Serial => "serial",
            SchedulingPolicy::Parallel => "parallel",
        }
    }
}

impl FromStr for SchedulingPolicy {
    type Err = ChaosError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serial" => Ok(SchedulingPolicy::Serial),
            "parallel" => Ok(SchedulingPolicy::Parallel),
            _ => Err(ChaosError::UnsupportedPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for SchedulingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
