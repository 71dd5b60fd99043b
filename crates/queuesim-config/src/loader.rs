//! Configuration loader with multi-source merging

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::{ENV_PREFIX, SimulationConfig};

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env_prefix: String,
}

impl ConfigLoader {
    /// Create a loader reading defaults and `QSIM_*` variables only
    pub fn new() -> Self {
        Self {
            file: None,
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    /// Add a TOML file; it must exist
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the environment variable prefix (default: "QSIM")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<SimulationConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = SimulationConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2. Configuration file
        if let Some(file) = &self.file {
            if !file.exists() {
                anyhow::bail!("Config file not found: {}", file.display());
            }
            builder = builder.add_source(
                config::File::from(file.as_path())
                    .required(true)
                    .format(config::FileFormat::Toml),
            );
        }

        // 3. Environment variables (QSIM_TICK_NS, QSIM_SEED, ...)
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        let simulation: SimulationConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        Ok(simulation)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
