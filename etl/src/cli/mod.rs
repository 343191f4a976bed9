use std::path::PathBuf;

use clap::Parser;

pub mod checkpoint;
pub mod database;
pub mod service;
pub mod source;
pub mod storage;

pub use checkpoint::CheckpointCliArgs;
pub use database::DatabaseCliArgs;
pub use service::ServiceCliArgs;
pub use source::SourceCliArgs;
pub use storage::StorageCliArgs;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "geosparql-etl",
    version,
    about = "Export pathology annotation marks from MongoDB as GeoSPARQL Turtle",
    long_about = "Streams analysis marks out of MongoDB, converts their polygons to WKT and writes \
    gzip-compressed Turtle batches. Progress is checkpointed per work unit so an interrupted \
    run resumes where it stopped.",
    after_help = "Examples:\n  \
    geosparql-etl --mark-link provenance\n  \
    geosparql-etl --config etl.yaml --worker-count 12\n  \
    geosparql-etl --config etl.yaml --status"
)]
pub struct Cli {
    /// Path to YAML configuration file
    #[arg(env = "GEOSPARQL_ETL_CONFIG", long = "config", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// Report checkpoint state and exit without processing
    #[arg(long, conflicts_with = "requeue_failed")]
    pub status: bool,

    /// Make every failed unit eligible again, then exit
    #[arg(long)]
    pub requeue_failed: bool,

    #[clap(flatten, next_help_heading = "Database")]
    pub database_args: DatabaseCliArgs,

    #[clap(flatten, next_help_heading = "Service")]
    pub service_args: ServiceCliArgs,

    #[clap(flatten, next_help_heading = "Storage")]
    pub storage_args: StorageCliArgs,

    #[clap(flatten, next_help_heading = "Checkpoint")]
    pub checkpoint_args: CheckpointCliArgs,

    #[clap(flatten, next_help_heading = "Source")]
    pub source_args: SourceCliArgs,
}
