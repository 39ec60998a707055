//! Run an experiment.

use anyhow::{Context, Result};
use hog_core::{
    AbortWatcher, Config, Experiment, MockExecutor, RemoteExecutor, StaticTargetSource,
    TargetSource,
};
use hog_docker::{DockerExecutor, DockerTargetSource};
use hog_types::{InjectionOutcome, Instance, RunResult};
use std::path::Path;
use std::sync::Arc;

use super::{load_config, Overrides};
use crate::probe::CommandProbe;
use crate::report::FileResultStore;

const MOCK_NAMESPACE: &str = "mock";
const MOCK_FLEET_SIZE: usize = 3;

/// Run the run command.
pub async fn run(config_path: &Path, overrides: &Overrides, mock: bool) -> Result<()> {
    let config = load_config(config_path, overrides)?;
    let results = Arc::new(FileResultStore::new(
        &config.result.path,
        &config.experiment.name,
    ));

    let (executor, source): (Arc<dyn RemoteExecutor>, Arc<dyn TargetSource>) = if mock {
        tracing::info!("using mock executor");
        (
            Arc::new(MockExecutor::new()),
            Arc::new(StaticTargetSource::new(mock_instances(&config))),
        )
    } else {
        let docker = hog_docker::connect().context("Failed to connect to Docker")?;
        (
            Arc::new(DockerExecutor::new(docker.clone())),
            Arc::new(DockerTargetSource::new(docker)),
        )
    };

    let mut experiment = Experiment::new(config.clone(), executor, source, results.clone());
    if !config.probes.is_empty() {
        experiment = experiment.with_probes(Arc::new(CommandProbe::new(config.probes.clone())));
    }

    let abort = AbortWatcher::new();
    let listener = abort.listen_for_signals();
    let outcome = experiment.run(abort.token()).await;
    listener.abort();

    match outcome {
        Ok(result) => {
            print_summary(&config, &result);
            println!("Result: {}", results.path().display());
            Ok(())
        }
        Err(err) if err.is_aborted() => {
            eprintln!("Experiment aborted; result: {}", results.path().display());
            std::process::exit(1);
        }
        Err(err) => Err(anyhow::Error::new(err).context("Experiment failed")),
    }
}

/// Named targets, or a small synthetic fleet when selecting by label.
fn mock_instances(config: &Config) -> Vec<Instance> {
    let names: Vec<String> = if config.targets.names.is_empty() {
        (0..MOCK_FLEET_SIZE).map(|i| format!("mock-{}", i)).collect()
    } else {
        config.targets.names.clone()
    };
    names
        .iter()
        .map(|name| Instance::new(MOCK_NAMESPACE, name, &["app"]))
        .collect()
}

fn print_summary(config: &Config, result: &RunResult) {
    println!("=== {} passed ===", config.experiment.name);
    println!(
        "  Memory:   {} MB for {}s ({})",
        config.experiment.memory_consumption_mb,
        config.experiment.chaos_duration_secs,
        config.experiment.sequence
    );
    println!("  Targets:");
    for outcome in &result.outcomes {
        let reverted = if result.reverted.contains(&outcome.target) {
            "reverted"
        } else {
            "not reverted"
        };
        println!(
            "    {:<32} {:<10} {}",
            outcome.target,
            outcome_label(&outcome.outcome),
            reverted
        );
    }
}

fn outcome_label(outcome: &InjectionOutcome) -> &'static str {
    match outcome {
        InjectionOutcome::Completed => "completed",
        InjectionOutcome::OomKilled => "oom-killed",
        InjectionOutcome::Failed(_) => "failed",
        InjectionOutcome::Aborted => "aborted",
    }
}
