//! queuesim command line driver.
//!
//! Loads a simulation configuration, advances the pipeline tick by tick and
//! prints latency and throughput reports.
//!
//! # Quick Start
//!
//! ```bash
//! # Run the built-in storage write path for one simulated second
//! queuesim run --preset pdisk
//!
//! # Reproduce a run and emit machine-readable output
//! queuesim run --config sim.toml --seed 42 --json
//!
//! # Check a configuration without running it
//! queuesim validate --config sim.toml
//! ```

mod commands;
mod table;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

/// queuesim - closed-loop queueing pipeline simulator.
#[derive(Parser)]
#[command(name = "queuesim")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation and print the final report.
    Run(RunArgs),

    /// List built-in topologies.
    Presets,

    /// Check a configuration file without running it.
    Validate {
        /// Path to the TOML configuration.
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Path to a TOML configuration.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Built-in topology; replaces any stages from the configuration.
    #[arg(short, long)]
    pub preset: Option<String>,

    /// Seed for sampled service times (random when omitted).
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Simulated run length in milliseconds.
    #[arg(short, long)]
    pub duration_ms: Option<u64>,

    /// Simulated time per tick in nanoseconds.
    #[arg(short, long)]
    pub tick_ns: Option<u64>,

    /// Print the final report as JSON.
    #[arg(long)]
    pub json: bool,
}

fn main() -> Result<()> {
    // Initialize logging; reports go to stdout, logs to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Presets => {
            commands::presets::run();
            Ok(())
        }
        Commands::Validate { config } => commands::validate::run(&config),
    }
}
