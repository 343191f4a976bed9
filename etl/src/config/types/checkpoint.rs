use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::checkpoint::RotationPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    #[serde(default = "default_checkpoint_dir")]
    pub dir: PathBuf,

    #[serde(default)]
    pub rotation: RotationConfig,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self { dir: default_checkpoint_dir(), rotation: RotationConfig::default() }
    }
}

impl CheckpointConfig {
    /// Rotation policy handed to the store, `None` while rotation is disabled.
    pub fn rotation_policy(&self) -> Option<RotationPolicy> {
        self.rotation.enabled.then(|| self.rotation.policy.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(flatten)]
    pub policy: RotationPolicy,
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from("checkpoints")
}
