pub mod builder;
pub mod env_interpolation;
pub mod types;
pub mod validation;

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub use builder::{load_config, load_maintenance_config, ConfigBuilder};
pub use types::*;
pub use validation::Validate;

/// Versioned configuration wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "config_version")]
pub enum EtlConfigVersioned {
    #[serde(rename = "1")]
    V1(EtlConfigV1),
}

impl EtlConfigVersioned {
    /// Load configuration from a YAML file, interpolating `${VAR}` references first
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let content = env_interpolation::interpolate_yaml_content(&content)
            .with_context(|| format!("Failed to interpolate config file: {}", path.display()))?;

        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let yaml_value: serde_yaml::Value = serde_yaml::from_str(content).context("Failed to parse YAML")?;

        if yaml_value.get("config_version").is_none() {
            anyhow::bail!(
                "Missing required field 'config_version' in config file. \
                 Current supported version: 1"
            );
        }

        let versioned: EtlConfigVersioned = serde_yaml::from_str(content).context("Failed to deserialize config")?;
        Ok(versioned)
    }

    pub fn into_canonical(self) -> EtlConfig {
        match self {
            EtlConfigVersioned::V1(v1) => v1,
        }
    }
}

/// Canonical configuration (always latest version internally)
pub type EtlConfig = EtlConfigV1;

/// Version 1 of the ETL configuration. Every section may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtlConfigV1 {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    #[serde(default)]
    pub source: SourceConfig,
}
