//! Built-in topologies.
//!
//! Both presets model a storage write path: an input queue feeding a
//! single-threaded disk layer, a submit queue, a single-threaded transport
//! layer, a highly parallel NVMe device and a flush barrier that completes
//! writes in submission order.

use crate::{PercentileEntry, StageConfig};

/// Events in flight in the write-path presets.
pub const WRITE_PATH_IN_FLIGHT: usize = 32;

/// Concurrent commands the modelled NVMe device accepts.
pub const NVME_QUEUE_DEPTH: usize = 128;

/// A named topology.
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    nvme_table: &'static [(f64, u64)],
}

impl Preset {
    /// Stage list of this preset.
    pub fn stages(&self) -> Vec<StageConfig> {
        write_path(self.nvme_table)
    }
}

/// NVMe latency profile of a healthy device: (percentile, microseconds).
const FAST_NVME: &[(f64, u64)] = &[
    (16.47, 12),
    (87.26, 25),
    (99.7, 50),
    (99.992, 100),
    (99.9968, 200),
    (100.0, 4_000),
];

/// NVMe latency profile of a device under background load.
const SLOW_NVME: &[(f64, u64)] = &[
    (3.813, 12),
    (51.59, 25),
    (98.851, 50),
    (99.956, 100),
    (99.983, 200),
    (99.983, 200),
    (100.0, 4_000),
];

const PRESETS: &[Preset] = &[
    Preset {
        name: "pdisk",
        description: "Storage write path with a healthy NVMe device",
        nvme_table: FAST_NVME,
    },
    Preset {
        name: "pdisk-slow-nvme",
        description: "Storage write path with a slow NVMe device",
        nvme_table: SLOW_NVME,
    },
];

/// All built-in presets.
pub fn presets() -> &'static [Preset] {
    PRESETS
}

/// Looks up a preset by name.
pub fn preset(name: &str) -> Option<&'static Preset> {
    PRESETS.iter().find(|preset| preset.name == name)
}

fn write_path(nvme_table: &[(f64, u64)]) -> Vec<StageConfig> {
    vec![
        StageConfig::Queue {
            name: "InputQ".to_string(),
            initial_events: WRITE_PATH_IN_FLIGHT,
        },
        StageConfig::FixedPool {
            name: "PDisk".to_string(),
            workers: 1,
            service_time_us: 5,
        },
        StageConfig::Queue {
            name: "SubmitQ".to_string(),
            initial_events: 0,
        },
        StageConfig::FixedPool {
            name: "Smb".to_string(),
            workers: 1,
            service_time_us: 2,
        },
        StageConfig::PercentilePool {
            name: "NVMe".to_string(),
            workers: NVME_QUEUE_DEPTH,
            latencies: nvme_table
                .iter()
                .map(|&(percentile, latency_us)| PercentileEntry {
                    percentile,
                    latency_us,
                })
                .collect(),
        },
        StageConfig::OrderingBarrier {
            name: "Flush".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use queuesim::{Pipeline, PipelineConfig, StageSpec};

    #[test]
    fn names_are_unique() {
        for (i, a) in presets().iter().enumerate() {
            for b in &presets()[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }

    #[test]
    fn unknown_preset_is_absent() {
        assert!(preset("hdd").is_none());
    }

    #[test]
    fn every_preset_builds_a_pipeline() {
        for preset in presets() {
            let specs = preset
                .stages()
                .into_iter()
                .map(StageConfig::into_spec)
                .collect::<Result<Vec<StageSpec>, _>>()
                .expect("preset converts");
            let pipeline = Pipeline::new(PipelineConfig::default(), specs)
                .unwrap_or_else(|e| panic!("preset {} invalid: {e}", preset.name));
            assert_eq!(pipeline.seed_population(), WRITE_PATH_IN_FLIGHT);
            assert_eq!(pipeline.stage_count(), 6);
        }
    }

    #[test]
    fn slow_profile_keeps_duplicate_breakpoint() {
        let stages = preset("pdisk-slow-nvme").expect("preset exists").stages();
        let StageConfig::PercentilePool { latencies, .. } = &stages[4] else {
            panic!("NVMe stage should be a percentile pool");
        };
        assert_eq!(latencies.len(), 7);
        assert_eq!(latencies[4], latencies[5]);
        assert_eq!(latencies.last().map(|e| e.percentile), Some(100.0));
    }
}
