use serde::{Deserialize, Serialize};

/// Cores left to the database and the OS when the worker count is not configured.
const RESERVED_CORES: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Units dispatched per chunk, as a multiple of the worker count
    #[serde(default = "default_chunk_factor")]
    pub chunk_factor: usize,

    /// Finished units between two progress reports
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,

    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,
}

impl ServiceConfig {
    pub fn chunk_size(&self) -> usize {
        self.worker_count.saturating_mul(self.chunk_factor).max(1)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            chunk_factor: default_chunk_factor(),
            progress_interval: default_progress_interval(),
            shutdown_timeout_seconds: default_shutdown_timeout(),
        }
    }
}

pub fn default_worker_count() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1).saturating_sub(RESERVED_CORES).max(1)
}
fn default_chunk_factor() -> usize {
    10
}
fn default_progress_interval() -> usize {
    50
}
fn default_shutdown_timeout() -> u64 {
    30
}
