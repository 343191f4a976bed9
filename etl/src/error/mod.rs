use thiserror::Error;

use crate::checkpoint::CheckpointError;
use crate::core::client::database::DatabaseError;
use crate::writer::WriterError;

/// Result type for pipeline operations
pub type EtlResult<T> = Result<T, EtlError>;

/// Error types for the pipeline
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Database error: {0}")]
    DatabaseCoreError(#[from] DatabaseError),

    #[error("Checkpoint error: {0}")]
    CheckpointError(#[from] CheckpointError),

    #[error("Writer error: {0}")]
    WriterError(#[from] WriterError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A work unit could not be processed
    #[error("Worker error: {0}")]
    WorkerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("ETL error: {0}")]
    EtlAnyHowError(#[from] anyhow::Error),
}
