//! Configurations drive real pipelines end to end.

use std::fs;

use queuesim_config::{ConfigLoader, SimulationConfig, WRITE_PATH_IN_FLIGHT, presets};
use tempfile::tempdir;

#[test]
fn configured_file_runs_to_completion() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("sim.toml");
    fs::write(
        &path,
        r#"
seed = 5
duration_ms = 2

[[stages]]
kind = "queue"
name = "InputQ"
initial_events = 1

[[stages]]
kind = "fixed-pool"
name = "PDisk"
workers = 1
service_time_us = 5

[[stages]]
kind = "queue"
name = "SubmitQ"

[[stages]]
kind = "fixed-pool"
name = "Smb"
workers = 1
service_time_us = 3
"#,
    )
    .expect("Failed to write config");

    let config = ConfigLoader::new()
        .with_env_prefix("QSIM_RUN_TEST")
        .with_file(&path)
        .load()
        .expect("Failed to load config");
    config.validate().expect("valid configuration");

    let seed = config.seed.expect("seed configured");
    let mut pipeline = config.build_pipeline(seed).expect("pipeline builds");
    pipeline.run_ticks(config.total_ticks(), config.tick_ns);

    assert_eq!(config.total_ticks(), 2_000);
    assert_eq!(pipeline.elapsed_ns(), 2_000_000);
    assert_eq!(pipeline.population(), 1);
    // One lap takes 9us at 1us ticks.
    assert_eq!(pipeline.completed(), 222);
}

#[test]
fn every_preset_runs() {
    for preset in presets() {
        let mut config = SimulationConfig::with_preset(preset.name);
        config.duration_ms = 5;
        config.validate().expect("preset is valid");

        let mut pipeline = config.build_pipeline(1).expect("pipeline builds");
        pipeline.run_ticks(config.total_ticks(), config.tick_ns);

        assert_eq!(pipeline.population(), WRITE_PATH_IN_FLIGHT);
        assert!(pipeline.completed() > 0, "preset {} completed nothing", preset.name);
        assert!(pipeline.latency().p50_us.is_some());
    }
}
