//! Configuration management for queuesim
//!
//! A run is described by a [`SimulationConfig`]: the pipeline topology
//! (explicit stages or a named preset), the seed, the tick size and the run
//! length. Configuration is loaded from multiple sources:
//! 1. Environment variables (QSIM_* prefix, highest precedence)
//! 2. A TOML file given on the command line
//! 3. Built-in defaults (lowest precedence)
//!
//! ```toml
//! seed = 42
//! duration_ms = 500
//!
//! [[stages]]
//! kind = "queue"
//! name = "InputQ"
//! initial_events = 4
//!
//! [[stages]]
//! kind = "fixed-pool"
//! name = "Disk"
//! workers = 2
//! service_time_us = 5
//! ```

#![cfg_attr(test, allow(clippy::float_cmp))]

use std::path::Path;

use queuesim::stage::DEFAULT_LOAD_WINDOW_NS;
use queuesim::{NS_PER_US, PercentilePoint, Pipeline, PipelineConfig, StageSpec, ms_to_ns};
use serde::{Deserialize, Serialize};

mod error;
mod loader;
mod presets;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use presets::{NVME_QUEUE_DEPTH, Preset, WRITE_PATH_IN_FLIGHT, preset, presets};

/// Environment variable prefix read by [`ConfigLoader`].
pub const ENV_PREFIX: &str = "QSIM";

/// Main simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for sampled service times. Drawn from entropy when absent.
    pub seed: Option<u64>,
    /// Simulated time per tick.
    pub tick_ns: u64,
    /// Simulated run length.
    pub duration_ms: u64,
    /// Simulated time between progress reports.
    pub report_interval_ms: u64,
    /// Load averaging window of worker pools.
    pub load_window_ms: u64,
    /// Built-in topology; mutually exclusive with `stages`.
    pub preset: Option<String>,
    pub stages: Vec<StageConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            tick_ns: 1_000,
            duration_ms: 1_000,
            report_interval_ms: 800,
            load_window_ms: DEFAULT_LOAD_WINDOW_NS / ms_to_ns(1),
            preset: None,
            stages: Vec::new(),
        }
    }
}

/// One stage of a configured topology. Durations are in microseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StageConfig {
    Queue {
        name: String,
        #[serde(default)]
        initial_events: usize,
    },
    FixedPool {
        name: String,
        workers: usize,
        service_time_us: u64,
    },
    PercentilePool {
        name: String,
        workers: usize,
        latencies: Vec<PercentileEntry>,
    },
    OrderingBarrier {
        name: String,
    },
}

/// Service time `latency_us` applies to draws below `percentile`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileEntry {
    pub percentile: f64,
    pub latency_us: u64,
}

fn us_to_ns_checked(stage: &str, us: u64) -> Result<u64, ConfigError> {
    us.checked_mul(NS_PER_US).ok_or_else(|| {
        ConfigError::ValidationError(format!("stage '{stage}': {us} us does not fit in u64 ns"))
    })
}

impl StageConfig {
    pub fn name(&self) -> &str {
        match self {
            Self::Queue { name, .. }
            | Self::FixedPool { name, .. }
            | Self::PercentilePool { name, .. }
            | Self::OrderingBarrier { name } => name,
        }
    }

    /// Converts to the core stage description.
    pub fn into_spec(self) -> Result<StageSpec, ConfigError> {
        Ok(match self {
            Self::Queue {
                name,
                initial_events,
            } => StageSpec::queue(name, initial_events),
            Self::FixedPool {
                name,
                workers,
                service_time_us,
            } => {
                let service_time_ns = us_to_ns_checked(&name, service_time_us)?;
                StageSpec::fixed_pool(name, workers, service_time_ns)
            }
            Self::PercentilePool {
                name,
                workers,
                latencies,
            } => {
                let table = latencies
                    .iter()
                    .map(|entry| {
                        us_to_ns_checked(&name, entry.latency_us)
                            .map(|ns| PercentilePoint::new(entry.percentile, ns))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                StageSpec::percentile_pool(name, workers, table)
            }
            Self::OrderingBarrier { name } => StageSpec::ordering_barrier(name),
        })
    }
}

impl SimulationConfig {
    /// Load configuration from defaults, environment and an optional file
    pub fn load(file: Option<&Path>) -> anyhow::Result<Self> {
        let mut loader = ConfigLoader::new();
        if let Some(file) = file {
            loader = loader.with_file(file);
        }
        loader.load()
    }

    /// Parse a TOML document on top of the defaults
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Create a configuration running a built-in preset
    pub fn with_preset(name: impl Into<String>) -> Self {
        Self {
            preset: Some(name.into()),
            ..Default::default()
        }
    }

    /// Checks run parameters and the topology.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_ns == 0 {
            return Err(ConfigError::ValidationError(
                "tick_ns must be positive".to_string(),
            ));
        }
        if self.duration_ms == 0 {
            return Err(ConfigError::ValidationError(
                "duration_ms must be positive".to_string(),
            ));
        }
        if self.report_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "report_interval_ms must be positive".to_string(),
            ));
        }
        for (field, ms) in [
            ("duration_ms", self.duration_ms),
            ("report_interval_ms", self.report_interval_ms),
            ("load_window_ms", self.load_window_ms),
        ] {
            if ms.checked_mul(ms_to_ns(1)).is_none() {
                return Err(ConfigError::ValidationError(format!(
                    "{field} = {ms} does not fit in u64 ns"
                )));
            }
        }

        // Building the pipeline runs every stage-level check.
        self.build_pipeline(0).map(|_| ())
    }

    /// Resolves explicit stages or the named preset.
    pub fn stage_configs(&self) -> Result<Vec<StageConfig>, ConfigError> {
        match (&self.preset, self.stages.is_empty()) {
            (Some(_), false) => Err(ConfigError::ValidationError(
                "set either `preset` or `stages`, not both".to_string(),
            )),
            (None, true) => Err(ConfigError::ValidationError(
                "no topology: set `preset` or at least two `stages`".to_string(),
            )),
            (Some(name), true) => preset(name)
                .map(Preset::stages)
                .ok_or_else(|| ConfigError::UnknownPreset(name.clone())),
            (None, false) => Ok(self.stages.clone()),
        }
    }

    /// Core stage descriptions for [`Pipeline::new`].
    pub fn pipeline_specs(&self) -> Result<Vec<StageSpec>, ConfigError> {
        self.stage_configs()?
            .into_iter()
            .map(StageConfig::into_spec)
            .collect()
    }

    pub fn pipeline_config(&self, seed: u64) -> PipelineConfig {
        PipelineConfig::default()
            .with_seed(seed)
            .with_load_window_ns(ms_to_ns(self.load_window_ms))
    }

    /// Builds the configured pipeline with `seed`.
    pub fn build_pipeline(&self, seed: u64) -> Result<Pipeline, ConfigError> {
        let specs = self.pipeline_specs()?;
        Ok(Pipeline::new(self.pipeline_config(seed), specs)?)
    }

    /// Ticks needed to cover `duration_ms`, rounded up.
    pub fn total_ticks(&self) -> u64 {
        ms_to_ns(self.duration_ms).div_ceil(self.tick_ns.max(1))
    }

    /// Ticks between progress reports, at least one.
    pub fn report_interval_ticks(&self) -> u64 {
        (ms_to_ns(self.report_interval_ms) / self.tick_ns.max(1)).max(1)
    }
}
