//! Unit processing and the run loop around it.

pub mod metrics;
pub mod orchestrator;
pub mod processor;

pub use orchestrator::{Orchestrator, RunSummary};
pub use processor::Worker;
