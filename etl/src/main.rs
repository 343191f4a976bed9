use std::sync::Arc;

use anyhow::Result;
use clap::Parser as _;
use dotenvy::dotenv;
use geosparql_etl::checkpoint::CheckpointStore;
use geosparql_etl::cli::Cli;
use geosparql_etl::config::{load_config, load_maintenance_config, EtlConfig};
use geosparql_etl::core::client::database::mongodb::MongoConnector;
use geosparql_etl::core::client::database::StoreConnector;
use geosparql_etl::utils::logging::init_logging;
use geosparql_etl::utils::signal_handler::SignalHandler;
use geosparql_etl::worker::Orchestrator;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_logging()?;
    let cli = Cli::parse();

    let result = if cli.status {
        report_status(&cli)
    } else if cli.requeue_failed {
        requeue_failed(&cli)
    } else {
        run_pipeline(&cli).await
    };

    if let Err(e) = &result {
        error!(error = %e, error_chain = ?e, "geosparql-etl failed");
    }
    result
}

async fn run_pipeline(cli: &Cli) -> Result<()> {
    let config: EtlConfig = load_config(cli)?;
    info!("Starting geosparql-etl");

    let checkpoint =
        Arc::new(CheckpointStore::open(config.checkpoint.dir.clone(), config.checkpoint.rotation_policy())?);
    let stats = checkpoint.stats();
    info!(
        dir = %checkpoint.dir().display(),
        completed = stats.completed,
        failed = stats.failed,
        "Checkpoint loaded"
    );

    let connector: Arc<dyn StoreConnector> = Arc::new(MongoConnector::new(config.database.clone()));
    let shutdown = CancellationToken::new();

    let mut signal_handler = SignalHandler::new(shutdown.clone());
    let signals = tokio::spawn(async move {
        if let Err(e) = signal_handler.wait_for_shutdown().await {
            warn!(error = %e, "Signal handling unavailable, the run can only be stopped by killing it");
        }
    });

    let orchestrator = Orchestrator::new(config, connector, checkpoint, shutdown);
    let result = orchestrator.run().await;
    signals.abort();

    let summary = result?;
    info!(
        run_id = %summary.run_id,
        interrupted = summary.interrupted,
        completed = summary.snapshot.completed,
        failed = summary.snapshot.failed,
        records = summary.snapshot.records,
        "geosparql-etl stopped"
    );
    Ok(())
}

fn report_status(cli: &Cli) -> Result<()> {
    let config = load_maintenance_config(cli)?;
    let store = CheckpointStore::inspect(config.checkpoint.dir.clone())?;

    let stats = store.stats();
    info!(dir = %store.dir().display(), completed = stats.completed, failed = stats.failed, "Checkpoint status");

    for (key, reason) in store.failed_entries() {
        info!(unit = %key, reason = %reason, "Failed unit");
    }

    let in_progress = store.in_progress_entries()?;
    if in_progress.is_empty() {
        info!("No unit in progress");
    }
    for entry in in_progress {
        info!(unit = %entry.key, worker_id = %entry.worker_id, started_at = %entry.started_at, "Unit in progress");
    }
    Ok(())
}

fn requeue_failed(cli: &Cli) -> Result<()> {
    let config = load_maintenance_config(cli)?;
    // a run may be live in this directory; leave its in-progress and torn lines alone
    let store = CheckpointStore::inspect(config.checkpoint.dir.clone())?;
    let requeued = store.requeue_failed()?;
    info!(dir = %store.dir().display(), requeued, "Failed units are eligible again");
    Ok(())
}
