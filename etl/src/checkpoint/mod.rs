//! Durable completed / failed / in-progress bookkeeping.
//!
//! Layout of the checkpoint directory:
//! - `completed_analyses.txt`: one bare key per line
//! - `failed_analyses.txt`: `key|reason` per line
//! - `in_progress.txt`: `key|worker_id|timestamp` per line, advisory, cleared on open
//! - `archive/`: rotated completed files plus `index.json`
//!
//! Every append is flushed and synced before returning, so a killed process loses at
//! most the line being written. A torn trailing line is ignored (and cut off) on load.

pub mod error;
mod io;
pub mod rotation;
pub mod store;

pub use error::CheckpointError;
pub use rotation::{ArchiveIndex, ArchiveRecord, RotationPolicy};
pub use store::{CheckpointStats, CheckpointStore, InProgressEntry};
