pub mod checkpoint;
pub mod database;
pub mod service;
pub mod source;
pub mod storage;

pub use checkpoint::{CheckpointConfig, RotationConfig};
pub use database::DatabaseConfig;
pub use service::ServiceConfig;
pub use source::{SourceConfig, SourceStrategy};
pub use storage::StorageConfig;
