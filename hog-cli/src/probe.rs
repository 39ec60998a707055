//! Command probes: local shell commands that must exit 0.

use async_trait::async_trait;
use hog_core::{ProbeConfig, ProbeRunner};
use hog_types::ChaosError;
use std::time::Duration;
use tokio::process::Command;

/// Runs each configured probe in order; the first failure stops the phase.
pub struct CommandProbe {
    probes: Vec<ProbeConfig>,
}

impl CommandProbe {
    /// Create a runner over `probes`.
    pub fn new(probes: Vec<ProbeConfig>) -> Self {
        Self { probes }
    }

    async fn run_one(&self, probe: &ProbeConfig, phase: &str) -> Result<(), ChaosError> {
        let fail = |reason: String| ChaosError::Probe {
            phase: phase.to_string(),
            reason: format!("{}: {}", probe.name, reason),
        };

        let mut command = Command::new("/bin/sh");
        command.arg("-c").arg(&probe.command).kill_on_drop(true);

        let output = tokio::time::timeout(Duration::from_secs(probe.timeout_secs), command.output())
            .await
            .map_err(|_| fail(format!("timed out after {}s", probe.timeout_secs)))?
            .map_err(|e| fail(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(fail(format!(
                "exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        tracing::info!(probe = %probe.name, phase, "probe passed");
        Ok(())
    }
}

#[async_trait]
impl ProbeRunner for CommandProbe {
    async fn run_probes(&self, phase: &str) -> Result<(), ChaosError> {
        for probe in &self.probes {
            self.run_one(probe, phase).await?;
        }
        Ok(())
    }
}
