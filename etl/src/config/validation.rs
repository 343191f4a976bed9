use anyhow::{bail, Context, Result};

use super::{
    CheckpointConfig, DatabaseConfig, EtlConfig, ServiceConfig, SourceConfig, SourceStrategy, StorageConfig,
};
use crate::writer::BuilderKind;

/// Highest shard count the one-hex-digit split supports.
pub const MAX_SHARD_COUNT: usize = 16;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

impl Validate for EtlConfig {
    fn validate(&self) -> Result<()> {
        self.database.validate().context("Invalid database configuration")?;
        self.service.validate().context("Invalid service configuration")?;
        self.storage.validate().context("Invalid storage configuration")?;
        self.checkpoint.validate().context("Invalid checkpoint configuration")?;
        self.source.validate().context("Invalid source configuration")?;

        if self.source.strategy == SourceStrategy::RangeShard && self.storage.builder != BuilderKind::Minimal {
            bail!(
                "The range_shard strategy has no analysis context; storage.builder must be 'minimal', got '{}'",
                self.storage.builder.build().name()
            );
        }
        Ok(())
    }
}

impl Validate for DatabaseConfig {
    fn validate(&self) -> Result<()> {
        if self.connection_url.trim().is_empty() {
            bail!("connection_url must not be empty");
        }
        if self.database_name.trim().is_empty() {
            bail!("database_name must not be empty");
        }
        if self.cursor_batch_size == 0 {
            bail!("cursor_batch_size must be greater than 0");
        }
        Ok(())
    }
}

impl Validate for ServiceConfig {
    fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            bail!("worker_count must be greater than 0");
        }
        if self.chunk_factor == 0 {
            bail!("chunk_factor must be greater than 0");
        }
        if self.progress_interval == 0 {
            bail!("progress_interval must be greater than 0");
        }
        Ok(())
    }
}

impl Validate for StorageConfig {
    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("batch_size must be greater than 0");
        }
        if self.compression_level > 9 {
            bail!("compression_level must be between 0 and 9, got {}", self.compression_level);
        }
        Ok(())
    }
}

impl Validate for CheckpointConfig {
    fn validate(&self) -> Result<()> {
        let rotation = &self.rotation;
        if !rotation.enabled {
            return Ok(());
        }
        if rotation.policy.max_bytes.is_none() && rotation.policy.max_entries.is_none() {
            bail!("rotation is enabled but neither max_bytes nor max_entries is set");
        }
        if let Some(max_entries) = rotation.policy.max_entries {
            if max_entries <= rotation.policy.keep_tail {
                bail!("rotation max_entries ({}) must exceed keep_tail ({})", max_entries, rotation.policy.keep_tail);
            }
        }
        Ok(())
    }
}

impl Validate for SourceConfig {
    fn validate(&self) -> Result<()> {
        if self.strategy == SourceStrategy::Grouping && self.mark_link.is_none() {
            bail!("mark_link is required for the grouping strategy (provenance or analysis_id)");
        }
        if !(1..=MAX_SHARD_COUNT).contains(&self.shard_count) {
            bail!("shard_count must be between 1 and {}, got {}", MAX_SHARD_COUNT, self.shard_count);
        }
        if self.default_width == 0 || self.default_height == 0 {
            bail!("default_width and default_height must be greater than 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MarkLink;
    use rstest::rstest;

    fn valid() -> EtlConfig {
        let mut config = EtlConfig::default();
        config.source.mark_link = Some(MarkLink::Provenance);
        config
    }

    #[test]
    fn default_with_mark_link_is_valid() {
        valid().validate().unwrap();
    }

    #[test]
    fn grouping_requires_mark_link() {
        let err = EtlConfig::default().validate().unwrap_err();
        assert!(format!("{:#}", err).contains("mark_link is required"));
    }

    #[rstest]
    #[case::zero_batch(|c: &mut EtlConfig| c.storage.batch_size = 0, "batch_size")]
    #[case::zero_workers(|c: &mut EtlConfig| c.service.worker_count = 0, "worker_count")]
    #[case::compression(|c: &mut EtlConfig| c.storage.compression_level = 10, "compression_level")]
    #[case::shards(|c: &mut EtlConfig| c.source.shard_count = 17, "shard_count")]
    #[case::range_needs_minimal(|c: &mut EtlConfig| c.source.strategy = SourceStrategy::RangeShard, "minimal")]
    #[case::rotation_threshold(|c: &mut EtlConfig| c.checkpoint.rotation.enabled = true, "neither max_bytes")]
    #[case::rotation_tail(
        |c: &mut EtlConfig| {
            c.checkpoint.rotation.enabled = true;
            c.checkpoint.rotation.policy.max_entries = Some(10);
        },
        "keep_tail"
    )]
    fn invalid_settings_are_rejected(#[case] mutate: fn(&mut EtlConfig), #[case] expected: &str) {
        let mut config = valid();
        mutate(&mut config);
        let err = config.validate().unwrap_err();
        assert!(format!("{:#}", err).contains(expected), "unexpected error: {:#}", err);
    }

    #[test]
    fn range_shard_with_minimal_builder_needs_no_mark_link() {
        let mut config = EtlConfig::default();
        config.source.strategy = SourceStrategy::RangeShard;
        config.storage.builder = BuilderKind::Minimal;
        config.validate().unwrap();
    }
}
