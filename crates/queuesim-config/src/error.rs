//! Configuration error types

use std::path::PathBuf;

use queuesim::SimError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config at {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to parse TOML config: {0}")]
    InvalidToml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Unknown preset '{0}'")]
    UnknownPreset(String),

    #[error("Invalid pipeline: {0}")]
    Pipeline(#[from] SimError),
}
