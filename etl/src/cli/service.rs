use clap::Args;

pub(crate) fn parse_positive_usize(s: &str) -> Result<usize, String> {
    let value: usize = s.parse().map_err(|_| format!("'{}' is not a valid number", s))?;
    if value == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(value)
}

#[derive(Debug, Clone, Args)]
pub struct ServiceCliArgs {
    /// Number of concurrent workers. Defaults to the core count minus four, at least one.
    #[arg(env = "GEOSPARQL_ETL_WORKER_COUNT", long, value_parser = parse_positive_usize)]
    pub worker_count: Option<usize>,

    /// Units fetched and dispatched per chunk, as a multiple of the worker count.
    #[arg(env = "GEOSPARQL_ETL_CHUNK_FACTOR", long, value_parser = parse_positive_usize)]
    pub chunk_factor: Option<usize>,

    /// Finished units between two progress reports.
    #[arg(env = "GEOSPARQL_ETL_PROGRESS_INTERVAL", long, value_parser = parse_positive_usize)]
    pub progress_interval: Option<usize>,

    /// Seconds in-flight units get to finish after an interrupt before they are aborted.
    #[arg(env = "GEOSPARQL_ETL_SHUTDOWN_TIMEOUT", long)]
    pub shutdown_timeout: Option<u64>,
}
