pub const COMPLETED_FILE: &str = "completed_analyses.txt";
pub const FAILED_FILE: &str = "failed_analyses.txt";
pub const IN_PROGRESS_FILE: &str = "in_progress.txt";

pub const ARCHIVE_DIR: &str = "archive";
pub const ARCHIVE_INDEX_FILE: &str = "index.json";

pub const BATCH_FILE_PREFIX: &str = "batch_";
pub const BATCH_FILE_EXTENSION: &str = "ttl.gz";

/// Used when an analysis does not carry `image_width` / `image_height`
pub const DEFAULT_IMAGE_DIMENSION: u32 = 40_000;

/// Namespace of batch feature collection IRIs
pub const COLLECTION_IRI_PREFIX: &str = "urn:geosparql-etl:";

/// Separator between the grouping components of a work unit key
pub const KEY_SEPARATOR: &str = "::";
