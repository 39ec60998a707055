//! CLI command implementations.

pub mod run;
pub mod validate;

use anyhow::{Context, Result};
use clap::Args;
use hog_core::Config;
use std::path::{Path, PathBuf};

/// Flags that override the experiment file.
#[derive(Args, Debug, Default, Clone)]
pub struct Overrides {
    /// Chaos duration in seconds
    #[arg(long)]
    pub duration: Option<u64>,

    /// Scheduling sequence: serial or parallel
    #[arg(long)]
    pub sequence: Option<String>,

    /// Memory to consume per target, in MB
    #[arg(long)]
    pub memory: Option<u32>,

    /// Comma-separated target names (replaces the label selector)
    #[arg(long, value_delimiter = ',')]
    pub targets: Vec<String>,

    /// Result file path
    #[arg(long)]
    pub result: Option<PathBuf>,
}

impl Overrides {
    /// Apply the flags that were given.
    pub fn apply(&self, config: &mut Config) {
        if let Some(duration) = self.duration {
            config.experiment.chaos_duration_secs = duration;
        }
        if let Some(sequence) = &self.sequence {
            config.experiment.sequence = sequence.clone();
        }
        if let Some(memory) = self.memory {
            config.experiment.memory_consumption_mb = memory;
        }
        if !self.targets.is_empty() {
            config.targets.names = self.targets.clone();
            config.targets.labels = None;
        }
        if let Some(path) = &self.result {
            config.result.path = path.clone();
        }
    }
}

/// Load, override and validate an experiment file.
pub fn load_config(path: &Path, overrides: &Overrides) -> Result<Config> {
    let mut config = Config::from_file(path)
        .with_context(|| format!("Failed to load experiment from {}", path.display()))?;
    overrides.apply(&mut config);
    config.validate().context("Invalid experiment")?;
    Ok(config)
}
