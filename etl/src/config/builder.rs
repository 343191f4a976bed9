//! Configuration builder that implements the hierarchy: CLI > ENV > Config File > Defaults

use std::path::Path;

use anyhow::Result;
use tracing::{debug, info};

use super::{EtlConfig, EtlConfigVersioned, Validate};
use crate::cli::Cli;

/// Configuration builder that merges config from multiple sources
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: EtlConfig,
}

impl ConfigBuilder {
    /// Start from built-in defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the defaults with a config file
    pub fn with_config_file(mut self, path: &Path) -> Result<Self> {
        info!("Loading configuration from file: {}", path.display());
        self.config = EtlConfigVersioned::from_yaml_file(path)?.into_canonical();
        Ok(self)
    }

    /// Apply CLI overrides on top of the base config. Clap resolves env vars into the same
    /// fields, so this covers both CLI args and ENV vars.
    pub fn with_cli_overrides(mut self, cli: &Cli) -> Result<Self> {
        let config = &mut self.config;
        debug!("Applying CLI overrides to configuration");

        let db = &cli.database_args;
        if let Some(url) = &db.connection_url {
            debug!("Overriding database.connection_url from CLI");
            config.database.connection_url = url.clone();
        }
        if let Some(name) = &db.database_name {
            debug!("Overriding database.database_name from CLI: {}", name);
            config.database.database_name = name.clone();
        }
        if let Some(collection) = &db.analysis_collection {
            debug!("Overriding database.analysis_collection from CLI: {}", collection);
            config.database.analysis_collection = collection.clone();
        }
        if let Some(collection) = &db.marks_collection {
            debug!("Overriding database.marks_collection from CLI: {}", collection);
            config.database.marks_collection = collection.clone();
        }
        if let Some(size) = db.cursor_batch_size {
            debug!("Overriding database.cursor_batch_size from CLI: {}", size);
            config.database.cursor_batch_size = size;
        }

        let service = &cli.service_args;
        if let Some(workers) = service.worker_count {
            debug!("Overriding service.worker_count from CLI: {}", workers);
            config.service.worker_count = workers;
        }
        if let Some(factor) = service.chunk_factor {
            debug!("Overriding service.chunk_factor from CLI: {}", factor);
            config.service.chunk_factor = factor;
        }
        if let Some(interval) = service.progress_interval {
            debug!("Overriding service.progress_interval from CLI: {}", interval);
            config.service.progress_interval = interval;
        }
        if let Some(timeout) = service.shutdown_timeout {
            debug!("Overriding service.shutdown_timeout_seconds from CLI: {}", timeout);
            config.service.shutdown_timeout_seconds = timeout;
        }

        let storage = &cli.storage_args;
        if let Some(dir) = &storage.output_dir {
            debug!("Overriding storage.output_dir from CLI: {}", dir.display());
            config.storage.output_dir = dir.clone();
        }
        if let Some(size) = storage.batch_size {
            debug!("Overriding storage.batch_size from CLI: {}", size);
            config.storage.batch_size = size;
        }
        if let Some(level) = storage.compression_level {
            debug!("Overriding storage.compression_level from CLI: {}", level);
            config.storage.compression_level = level;
        }
        if let Some(builder) = storage.builder {
            debug!("Overriding storage.builder from CLI: {:?}", builder);
            config.storage.builder = builder;
        }

        let checkpoint = &cli.checkpoint_args;
        if let Some(dir) = &checkpoint.checkpoint_dir {
            debug!("Overriding checkpoint.dir from CLI: {}", dir.display());
            config.checkpoint.dir = dir.clone();
        }
        if checkpoint.rotate_checkpoints {
            debug!("Enabling checkpoint rotation from CLI");
            config.checkpoint.rotation.enabled = true;
        }
        if let Some(max_bytes) = checkpoint.rotation_max_bytes {
            debug!("Overriding checkpoint.rotation.max_bytes from CLI: {}", max_bytes);
            config.checkpoint.rotation.policy.max_bytes = Some(max_bytes);
        }
        if let Some(max_entries) = checkpoint.rotation_max_entries {
            debug!("Overriding checkpoint.rotation.max_entries from CLI: {}", max_entries);
            config.checkpoint.rotation.policy.max_entries = Some(max_entries);
        }
        if let Some(keep_tail) = checkpoint.rotation_keep_tail {
            debug!("Overriding checkpoint.rotation.keep_tail from CLI: {}", keep_tail);
            config.checkpoint.rotation.policy.keep_tail = keep_tail;
        }

        let source = &cli.source_args;
        if let Some(strategy) = source.strategy {
            debug!("Overriding source.strategy from CLI: {:?}", strategy);
            config.source.strategy = strategy;
        }
        if let Some(link) = source.mark_link {
            debug!("Overriding source.mark_link from CLI: {:?}", link);
            config.source.mark_link = Some(link);
        }
        if let Some(count) = source.shard_count {
            debug!("Overriding source.shard_count from CLI: {}", count);
            config.source.shard_count = count;
        }
        if let Some(filter) = source.range_filter {
            debug!("Overriding source.range_filter from CLI: {:?}", filter);
            config.source.range_filter = filter;
        }
        if let Some(width) = source.default_width {
            debug!("Overriding source.default_width from CLI: {}", width);
            config.source.default_width = width;
        }
        if let Some(height) = source.default_height {
            debug!("Overriding source.default_height from CLI: {}", height);
            config.source.default_height = height;
        }
        if source.ignore_slide {
            debug!("Disabling source.include_slide from CLI");
            config.source.include_slide = false;
        }

        Ok(self)
    }

    /// Build and validate the final configuration
    pub fn build(self) -> Result<EtlConfig> {
        info!("Validating configuration");
        self.config.validate()?;

        info!("Configuration loaded and validated successfully");
        Ok(self.config)
    }
}

/// Main entry point: optional config file, then CLI/ENV overrides, then validation
pub fn load_config(cli: &Cli) -> Result<EtlConfig> {
    merged(cli)?.build()
}

/// Merged configuration without pipeline validation. The status and requeue modes only
/// touch the checkpoint directory and must work without a mark link.
pub fn load_maintenance_config(cli: &Cli) -> Result<EtlConfig> {
    Ok(merged(cli)?.config)
}

fn merged(cli: &Cli) -> Result<ConfigBuilder> {
    let builder = ConfigBuilder::new();
    let builder = match &cli.config_file {
        Some(path) => builder.with_config_file(path)?,
        None => builder,
    };
    builder.with_cli_overrides(cli)
}
