use std::path::PathBuf;

use clap::Args;

use super::service::parse_positive_usize;

/// Checkpoint location and rotation thresholds.
#[derive(Debug, Clone, Args)]
pub struct CheckpointCliArgs {
    /// Directory holding the completed, failed and in-progress files.
    #[arg(env = "GEOSPARQL_ETL_CHECKPOINT_DIR", long, value_name = "DIR")]
    pub checkpoint_dir: Option<PathBuf>,

    /// Archive the completed file once it crosses a rotation threshold.
    #[arg(env = "GEOSPARQL_ETL_ROTATE_CHECKPOINTS", long)]
    pub rotate_checkpoints: bool,

    /// Rotate once the completed file reaches this many bytes.
    #[arg(env = "GEOSPARQL_ETL_ROTATION_MAX_BYTES", long)]
    pub rotation_max_bytes: Option<u64>,

    /// Rotate once the completed file reaches this many entries.
    #[arg(env = "GEOSPARQL_ETL_ROTATION_MAX_ENTRIES", long, value_parser = parse_positive_usize)]
    pub rotation_max_entries: Option<usize>,

    /// Most recent entries kept in the live file after a rotation.
    #[arg(env = "GEOSPARQL_ETL_ROTATION_KEEP_TAIL", long)]
    pub rotation_keep_tail: Option<usize>,
}
