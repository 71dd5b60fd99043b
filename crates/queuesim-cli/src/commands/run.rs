//! Drives a pipeline through a configured run.

use anyhow::{Context, Result};
use queuesim::{PipelineReport, ns_to_sec};
use queuesim_config::SimulationConfig;
use tracing::info;

use crate::RunArgs;
use crate::table;

/// Topology used when neither the configuration nor the flags name one.
const DEFAULT_PRESET: &str = "pdisk";

/// Runs a simulation.
pub fn run(args: RunArgs) -> Result<()> {
    let config = resolve_config(&args)?;
    config.validate().context("Invalid configuration")?;

    let seed = config.seed.unwrap_or_else(|| {
        let seed = rand::random::<u64>();
        info!(seed, "no seed configured, drawn from entropy");
        seed
    });

    let report = simulate(&config, seed)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        table::print_report(&report, seed);
    }

    Ok(())
}

/// Applies command line overrides on top of the loaded configuration.
pub fn resolve_config(args: &RunArgs) -> Result<SimulationConfig> {
    let mut config = SimulationConfig::load(args.config.as_deref())?;

    if let Some(preset) = &args.preset {
        config.preset = Some(preset.clone());
        config.stages.clear();
    } else if config.preset.is_none() && config.stages.is_empty() {
        config.preset = Some(DEFAULT_PRESET.to_string());
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(duration_ms) = args.duration_ms {
        config.duration_ms = duration_ms;
    }
    if let Some(tick_ns) = args.tick_ns {
        config.tick_ns = tick_ns;
    }

    Ok(config)
}

/// Advances the pipeline to the configured duration, logging progress
/// once per report interval.
pub fn simulate(config: &SimulationConfig, seed: u64) -> Result<PipelineReport> {
    let mut pipeline = config.build_pipeline(seed)?;
    info!(
        stages = pipeline.stage_count(),
        in_flight = pipeline.seed_population(),
        seed,
        "simulation started"
    );

    let total = config.total_ticks();
    let interval = config.report_interval_ticks();
    let mut done = 0;

    while done < total {
        let step = interval.min(total - done);
        pipeline.run_ticks(step, config.tick_ns);
        done += step;

        let latency = pipeline.latency();
        info!(
            elapsed_s = ns_to_sec(pipeline.elapsed_ns()),
            completed = pipeline.completed(),
            rps = pipeline.throughput().round(),
            p50_us = latency.p50_us,
            p99_us = latency.p99_us,
            "progress"
        );
    }

    Ok(pipeline.report())
}
