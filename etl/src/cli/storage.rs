use std::path::PathBuf;

use clap::Args;

use super::service::parse_positive_usize;
use crate::writer::BuilderKind;

/// Where and how batch files are written.
#[derive(Debug, Clone, Args)]
pub struct StorageCliArgs {
    /// Root directory for the Turtle batch files.
    #[arg(env = "GEOSPARQL_ETL_OUTPUT_DIR", long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Marks per batch file.
    #[arg(env = "GEOSPARQL_ETL_BATCH_SIZE", long, value_parser = parse_positive_usize)]
    pub batch_size: Option<usize>,

    /// gzip compression level (0-9).
    #[arg(env = "GEOSPARQL_ETL_COMPRESSION_LEVEL", long, value_parser = clap::value_parser!(u32).range(0..=9))]
    pub compression_level: Option<u32>,

    /// Layout of the generated Turtle documents.
    #[arg(env = "GEOSPARQL_ETL_BUILDER", long, value_enum)]
    pub builder: Option<BuilderKind>,
}
