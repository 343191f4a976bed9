use clap::Args;

use crate::config::SourceStrategy;
use crate::types::{MarkLink, RangeFilter};

/// Work-unit enumeration settings.
#[derive(Debug, Clone, Args)]
pub struct SourceCliArgs {
    /// How the job is cut into work units.
    #[arg(env = "GEOSPARQL_ETL_STRATEGY", long, value_enum)]
    pub strategy: Option<SourceStrategy>,

    /// Fields tying a mark to its analysis. Required for the grouping strategy.
    #[arg(env = "GEOSPARQL_ETL_MARK_LINK", long, value_enum)]
    pub mark_link: Option<MarkLink>,

    /// Number of ObjectId ranges for the range-shard strategy (1-16).
    #[arg(env = "GEOSPARQL_ETL_SHARD_COUNT", long)]
    pub shard_count: Option<usize>,

    /// Which unlinked marks the range-shard strategy sweeps.
    #[arg(env = "GEOSPARQL_ETL_RANGE_FILTER", long, value_enum)]
    pub range_filter: Option<RangeFilter>,

    /// Image width used when an analysis records none.
    #[arg(env = "GEOSPARQL_ETL_DEFAULT_WIDTH", long)]
    pub default_width: Option<u32>,

    /// Image height used when an analysis records none.
    #[arg(env = "GEOSPARQL_ETL_DEFAULT_HEIGHT", long)]
    pub default_height: Option<u32>,

    /// Do not split provenance-linked units by slide.
    #[arg(env = "GEOSPARQL_ETL_IGNORE_SLIDE", long)]
    pub ignore_slide: bool,
}
