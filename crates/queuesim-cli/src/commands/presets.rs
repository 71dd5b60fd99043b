//! Lists built-in topologies.

use queuesim_config::{Preset, StageConfig, presets};

use crate::table;

/// Short human-readable form of one stage.
fn describe(stage: &StageConfig) -> String {
    match stage {
        StageConfig::Queue {
            name,
            initial_events,
        } if *initial_events > 0 => format!("{name}({initial_events})"),
        StageConfig::Queue { name, .. } | StageConfig::OrderingBarrier { name } => name.clone(),
        StageConfig::FixedPool {
            name,
            workers,
            service_time_us,
        } => format!("{name}[{workers}x{service_time_us}us]"),
        StageConfig::PercentilePool { name, workers, .. } => format!("{name}[{workers}x~]"),
    }
}

/// Stage chain of a preset, head first.
pub fn topology(preset: &Preset) -> String {
    preset
        .stages()
        .iter()
        .map(describe)
        .collect::<Vec<_>>()
        .join(" -> ")
}

pub fn run() {
    let rows: Vec<Vec<String>> = presets()
        .iter()
        .map(|preset| {
            vec![
                preset.name.to_string(),
                preset.description.to_string(),
                topology(preset),
            ]
        })
        .collect();
    println!("{}", table::text_table(&["Preset", "Description", "Stages"], &rows));
}
