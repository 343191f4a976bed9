use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::writer::BuilderKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Members per batch file
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// gzip level, 0-9
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,

    #[serde(default)]
    pub builder: BuilderKind,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            batch_size: default_batch_size(),
            compression_level: default_compression_level(),
            builder: BuilderKind::default(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("ttl_output")
}
fn default_batch_size() -> usize {
    1000
}
fn default_compression_level() -> u32 {
    6
}
