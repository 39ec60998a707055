//! # memhog
//!
//! Command-line runner for memory-hog experiments.
//!
//! ## Commands
//!
//! - `run`: Stress the selected containers and revert them
//! - `validate`: Check an experiment file without touching any target
//!
//! ## Example
//!
//! ```bash
//! # Check the experiment
//! memhog --config memhog.toml validate
//!
//! # Run it against containers labelled app=cart, one at a time
//! memhog --config memhog.toml run --sequence serial
//!
//! # Dry run with the mock executor
//! memhog --config memhog.toml run --mock --duration 5
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod probe;
mod report;

use commands::{run, validate, Overrides};

/// Memory-hog fault injection for containers.
#[derive(Parser, Debug)]
#[command(name = "memhog")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Experiment file
    #[arg(long, short, global = true, default_value = "memhog.toml")]
    config: PathBuf,

    /// Log filter (overrides RUST_LOG), e.g. `debug` or `memhog_core=trace`
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the experiment
    Run {
        #[command(flatten)]
        overrides: Overrides,

        /// Use the mock executor instead of Docker (for testing/demo)
        #[arg(long)]
        mock: bool,
    },

    /// Validate the experiment file and print the resolved settings
    Validate {
        #[command(flatten)]
        overrides: Overrides,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match cli.command {
        Commands::Run { overrides, mock } => {
            run::run(&cli.config, &overrides, mock).await?;
        }
        Commands::Validate { overrides } => {
            validate::run(&cli.config, &overrides)?;
        }
    }

    Ok(())
}

/// Logs go to stderr; stdout is kept for the run summary.
fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
