use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Checkpoint I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid checkpoint key {0:?}: keys must not contain '|' or line breaks")]
    InvalidKey(String),

    #[error("Failed to parse archive index {path}: {source}")]
    ArchiveIndex {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Attach the offending path to an I/O error.
pub(crate) trait IoContext<T> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T, CheckpointError>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn at(self, path: impl Into<PathBuf>) -> Result<T, CheckpointError> {
        self.map_err(|source| CheckpointError::Io { path: path.into(), source })
    }
}
