/// Checkpoint store: completed / failed / in-progress bookkeeping
pub mod checkpoint;
/// Contains the CLI arguments for the pipeline
pub mod cli;
/// Configuration file loading and CLI overrides
pub mod config;
/// Data source clients
pub mod core;
/// Error types
pub mod error;
/// Normalized polygon to WKT conversion
pub mod geometry;
/// Work unit enumeration strategies
pub mod source;
/// Shared domain types
pub mod types;
/// Logging and signal handling
pub mod utils;
/// Worker and orchestrator
pub mod worker;
/// Batch accumulation and Turtle document builders
pub mod writer;

#[cfg(test)]
pub mod tests;

pub use error::{EtlError, EtlResult};
