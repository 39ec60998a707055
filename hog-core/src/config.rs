//! Configuration loading for memhog.
//!
//! Experiments are described in a TOML file (default: `memhog.toml`).

use hog_types::{SchedulingPolicy, StressSpec, TargetSelector, DEFAULT_KILL_COMMAND};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration for a memory-hog experiment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Stress and scheduling parameters.
    pub experiment: ExperimentConfig,
    /// Target selection.
    pub targets: TargetsConfig,
    /// Where the verdict is written.
    #[serde(default)]
    pub result: ResultConfig,
    /// Health probes run before injection.
    #[serde(default)]
    pub probes: Vec<ProbeConfig>,
}

/// Stress and scheduling parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentConfig {
    /// Experiment name used in events (default: memory-hog-exec).
    #[serde(default = "default_name")]
    pub name: String,
    /// Memory to consume per target in MB (default: 500).
    #[serde(default = "default_memory_consumption")]
    pub memory_consumption_mb: u32,
    /// Supervision window in seconds (default: 60).
    #[serde(default = "default_chaos_duration")]
    pub chaos_duration_secs: u64,
    /// Wait before and after injection in seconds (default: 0).
    #[serde(default)]
    pub ramp_time_secs: u64,
    /// `serial` or `parallel` (default: parallel).
    #[serde(default = "default_sequence")]
    pub sequence: String,
    /// Container to exec into. Defaults to the first container of the
    /// first target.
    #[serde(default)]
    pub target_container: Option<String>,
    /// Command that stops the stress process.
    #[serde(default = "default_kill_command")]
    pub chaos_kill_cmd: String,
    /// Wait before returning when aborted before injection (default: 10).
    #[serde(default = "default_abort_grace")]
    pub abort_grace_secs: u64,
}

/// Target selection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetsConfig {
    /// Explicit instance names.
    #[serde(default)]
    pub names: Vec<String>,
    /// Label selector, `key=value[,key=value]`.
    #[serde(default)]
    pub labels: Option<String>,
    /// Percentage of label-matched instances to affect (0 means all).
    #[serde(default)]
    pub affected_percentage: u8,
}

/// Result output.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultConfig {
    /// Path of the JSON verdict file (default: memhog-result.json).
    #[serde(default = "default_result_path")]
    pub path: PathBuf,
}

/// A local command run as a health probe.
#[derive(Debug, Clone, Deserialize)]
pub struct ProbeConfig {
    /// Probe name used in logs and errors.
    pub name: String,
    /// Shell command; a non-zero exit fails the probe.
    pub command: String,
    /// Probe timeout in seconds (default: 10).
    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,
}

// Default value functions
fn default_name() -> String {
    "memory-hog-exec".to_string()
}

fn default_memory_consumption() -> u32 {
    500
}

fn default_chaos_duration() -> u64 {
    60
}

fn default_sequence() -> String {
    "parallel".to_string()
}

fn default_kill_command() -> String {
    DEFAULT_KILL_COMMAND.to_string()
}

fn default_abort_grace() -> u64 {
    10
}

fn default_result_path() -> PathBuf {
    PathBuf::from("memhog-result.json")
}

fn default_probe_timeout() -> u64 {
    10
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            memory_consumption_mb: default_memory_consumption(),
            chaos_duration_secs: default_chaos_duration(),
            ramp_time_secs: 0,
            sequence: default_sequence(),
            target_container: None,
            chaos_kill_cmd: default_kill_command(),
            abort_grace_secs: default_abort_grace(),
        }
    }
}

impl Default for ResultConfig {
    fn default() -> Self {
        Self {
            path: default_result_path(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Check the experiment before anything is executed.
    ///
    /// The sequence is not checked here; an unknown value is reported as an
    /// unsupported policy once targets are selected.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.stress_spec()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.targets.affected_percentage > 100 {
            return Err(ConfigError::Invalid(format!(
                "affected_percentage must be between 0 and 100, got {}",
                self.targets.affected_percentage
            )));
        }

        if let Some(probe) = self.probes.iter().find(|p| p.command.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "probe {} has an empty command",
                probe.name
            )));
        }

        Ok(())
    }

    /// Stress parameters for the orchestrator.
    pub fn stress_spec(&self) -> StressSpec {
        StressSpec::new(
            self.experiment.memory_consumption_mb,
            self.experiment.chaos_duration_secs,
        )
        .with_kill_command(&self.experiment.chaos_kill_cmd)
    }

    /// Selector for the target source.
    pub fn selector(&self) -> TargetSelector {
        TargetSelector {
            names: self.targets.names.clone(),
            labels: self.targets.labels.clone(),
            affected_percentage: self.targets.affected_percentage,
        }
    }

    /// Parse the configured sequence.
    pub fn policy(&self) -> Result<SchedulingPolicy, hog_types::ChaosError> {
        self.experiment.sequence.parse()
    }

    /// Ramp time as a [`Duration`].
    pub fn ramp_time(&self) -> Duration {
        Duration::from_secs(self.experiment.ramp_time_secs)
    }

    /// Abort grace period as a [`Duration`].
    pub fn abort_grace(&self) -> Duration {
        Duration::from_secs(self.experiment.abort_grace_secs)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// Configuration parsed but describes an impossible experiment.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_experiment_tunables() {
        let config = Config::default();
        assert_eq!(config.experiment.memory_consumption_mb, 500);
        assert_eq!(config.experiment.chaos_duration_secs, 60);
        assert_eq!(config.experiment.sequence, "parallel");
        assert_eq!(config.experiment.abort_grace_secs, 10);
        assert_eq!(config.experiment.chaos_kill_cmd, DEFAULT_KILL_COMMAND);
        assert_eq!(config.result.path, PathBuf::from("memhog-result.json"));
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[experiment]
memory_consumption_mb = 1024
chaos_duration_secs = 30
sequence = "serial"
target_container = "app"

[targets]
labels = "app=cart"
affected_percentage = 50

[result]
path = "/tmp/result.json"

[[probes]]
name = "cart-health"
command = "curl -sf http://localhost:8080/health"
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.experiment.memory_consumption_mb, 1024);
        assert_eq!(config.experiment.target_container.as_deref(), Some("app"));
        assert_eq!(config.policy().unwrap(), SchedulingPolicy::Serial);
        assert_eq!(config.targets.affected_percentage, 50);
        assert_eq!(config.result.path, PathBuf::from("/tmp/result.json"));
        assert_eq!(config.probes.len(), 1);
        assert_eq!(config.probes[0].timeout_secs, 10);

        let spec = config.stress_spec();
        assert_eq!(spec.memory_mb, 1024);
        assert_eq!(spec.chaos_duration(), Duration::from_secs(30));
    }

    #[test]
    fn config_missing_fields_use_defaults() {
        let toml = r#"
[experiment]
[targets]
names = ["cart-0"]
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.experiment.memory_consumption_mb, 500);
        assert_eq!(config.experiment.ramp_time_secs, 0);
        assert!(config.probes.is_empty());
        assert_eq!(config.selector().names, vec!["cart-0"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_memory() {
        let mut config = Config::default();
        config.experiment.memory_consumption_mb = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn validate_rejects_percentage_over_100() {
        let mut config = Config::default();
        config.targets.affected_percentage = 150;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn validate_rejects_empty_probe_command() {
        let mut config = Config::default();
        config.probes.push(ProbeConfig {
            name: "noop".into(),
            command: " ".into(),
            timeout_secs: 1,
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("noop"));
    }

    #[test]
    fn unknown_sequence_parses_but_fails_policy() {
        let mut config = Config::default();
        config.experiment.sequence = "random".into();
        assert!(config.validate().is_ok());
        assert!(config.policy().is_err());
    }

    #[test]
    fn from_file_reads_and_reports_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[experiment]\nchaos_duration_secs = 5\n[targets]\nlabels = \"a=b\"").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.experiment.chaos_duration_secs, 5);

        let missing = Config::from_file(Path::new("/nonexistent/memhog.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::ReadError { .. }));

        let mut bad = tempfile::NamedTempFile::new().unwrap();
        writeln!(bad, "[experiment\nname = ").unwrap();
        assert!(matches!(
            Config::from_file(bad.path()),
            Err(ConfigError::ParseError { .. })
        ));
    }
}
