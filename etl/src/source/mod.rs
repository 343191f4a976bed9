//! Work-unit enumeration.
//!
//! Both strategies produce a lazy, single-pass stream. Units the checkpoint already
//! reports as terminal are filtered out while the stream is consumed.

pub mod grouping;
pub mod range_shard;

use std::sync::Arc;

use futures::stream::BoxStream;
use tracing::info;

pub use crate::config::SourceStrategy;
use crate::checkpoint::CheckpointStore;
use crate::config::SourceConfig;
use crate::core::client::database::AnnotationStore;
use crate::error::{EtlError, EtlResult};
use crate::types::WorkUnit;

pub type WorkUnitStream = BoxStream<'static, EtlResult<WorkUnit>>;

/// Enumerate the units still to process under the configured strategy.
pub async fn enumerate(
    store: &dyn AnnotationStore,
    config: &SourceConfig,
    checkpoint: Arc<CheckpointStore>,
) -> EtlResult<WorkUnitStream> {
    info!(strategy = ?config.strategy, "Enumerating work units");
    match config.strategy {
        SourceStrategy::Grouping => {
            let link = config
                .mark_link
                .ok_or_else(|| EtlError::ConfigError("mark_link is required for the grouping strategy".to_string()))?;
            grouping::analysis_units(store, link, config.include_slide, checkpoint).await
        }
        SourceStrategy::RangeShard => {
            range_shard::range_units(config.range_filter, config.shard_count, checkpoint)
        }
    }
}
