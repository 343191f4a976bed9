use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::types::constant::DEFAULT_IMAGE_DIMENSION;
use crate::types::{ImageDimensions, MarkLink, RangeFilter};

/// How the job is cut into work units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SourceStrategy {
    /// One unit per analysis grouping key
    #[default]
    Grouping,
    /// One unit per ObjectId prefix range of unlinked marks
    RangeShard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub strategy: SourceStrategy,

    /// Required by the grouping strategy
    #[serde(default)]
    pub mark_link: Option<MarkLink>,

    #[serde(default = "default_shard_count")]
    pub shard_count: usize,

    #[serde(default = "default_range_filter")]
    pub range_filter: RangeFilter,

    /// Used when an analysis carries no image width
    #[serde(default = "default_dimension")]
    pub default_width: u32,

    #[serde(default = "default_dimension")]
    pub default_height: u32,

    /// Split provenance-linked units by slide when the analysis names one
    #[serde(default = "default_include_slide")]
    pub include_slide: bool,
}

impl SourceConfig {
    pub fn fallback_dimensions(&self) -> ImageDimensions {
        ImageDimensions { width: self.default_width, height: self.default_height }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            strategy: SourceStrategy::default(),
            mark_link: None,
            shard_count: default_shard_count(),
            range_filter: default_range_filter(),
            default_width: default_dimension(),
            default_height: default_dimension(),
            include_slide: default_include_slide(),
        }
    }
}

fn default_shard_count() -> usize {
    16
}
fn default_range_filter() -> RangeFilter {
    RangeFilter::Null
}
fn default_dimension() -> u32 {
    DEFAULT_IMAGE_DIMENSION
}
fn default_include_slide() -> bool {
    true
}
