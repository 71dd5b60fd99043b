//! Configuration checks.

use std::path::Path;

use anyhow::{Context, Result};
use queuesim_config::ConfigLoader;

use crate::table;

/// Loads and validates a configuration file, printing the resolved run.
pub fn run(path: &Path) -> Result<()> {
    let config = ConfigLoader::new()
        .with_file(path)
        .load()
        .with_context(|| format!("Failed to load {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("{} is not a valid configuration", path.display()))?;

    let stages = config.stage_configs()?;
    let seed = config
        .seed
        .map_or_else(|| "random".to_string(), |seed| seed.to_string());
    let topology = stages
        .iter()
        .map(|stage| stage.name().to_string())
        .collect::<Vec<_>>()
        .join(" -> ");

    let rows = vec![
        vec!["Stages".to_string(), topology],
        vec!["Seed".to_string(), seed],
        vec!["Tick".to_string(), format!("{} ns", config.tick_ns)],
        vec!["Duration".to_string(), format!("{} ms", config.duration_ms)],
        vec![
            "Report interval".to_string(),
            format!("{} ms", config.report_interval_ms),
        ],
        vec![
            "Load window".to_string(),
            format!("{} ms", config.load_window_ms),
        ],
    ];

    println!("{} is valid", path.display());
    println!("{}", table::text_table(&["Setting", "Value"], &rows));
    Ok(())
}
