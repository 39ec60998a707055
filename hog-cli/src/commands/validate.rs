//! Validate an experiment file.

use anyhow::{Context, Result};
use std::path::Path;

use super::{load_config, Overrides};

/// Run the validate command.
pub fn run(config_path: &Path, overrides: &Overrides) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    let policy = config.policy().context("Invalid experiment")?;
    let experiment = &config.experiment;

    println!("=== {} ===", experiment.name);
    println!();
    println!("Stress:");
    println!("  Memory:    {} MB", experiment.memory_consumption_mb);
    println!("  Duration:  {}s", experiment.chaos_duration_secs);
    println!("  Sequence:  {}", policy);
    println!("  Ramp time: {}s", experiment.ramp_time_secs);
    println!(
        "  Container: {}",
        experiment
            .target_container
            .as_deref()
            .unwrap_or("(first container of first target)")
    );
    println!();

    let targets = &config.targets;
    println!("Targets:");
    if !targets.names.is_empty() {
        println!("  Names:     {}", targets.names.join(", "));
    } else if let Some(labels) = &targets.labels {
        let pct = match targets.affected_percentage {
            0 => 100,
            p => p,
        };
        println!("  Labels:    {} ({}% affected)", labels, pct);
    } else {
        println!("  NONE (set targets.names or targets.labels)");
    }
    println!();

    if !config.probes.is_empty() {
        println!("Probes:");
        for probe in &config.probes {
            println!("  {} ({}s): {}", probe.name, probe.timeout_secs, probe.command);
        }
        println!();
    }

    println!("Result file: {}", config.result.path.display());
    Ok(())
}
