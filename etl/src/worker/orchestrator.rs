use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, TryStreamExt};
use mongodb::bson::{Bson, Document};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::metrics::{record_progress, record_unit_outcome, record_units_enumerated};
use super::processor::Worker;
use crate::checkpoint::CheckpointStore;
use crate::config::{EtlConfig, StorageConfig};
use crate::core::client::database::{AnnotationStore, StoreConnector};
use crate::error::EtlResult;
use crate::source;
use crate::types::document::text;
use crate::types::{ProgressSnapshot, ProgressTracker, UnitOutcome, UnitStatus, WorkUnit};
use crate::writer::WriterSettings;

/// Totals of one orchestrator run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub snapshot: ProgressSnapshot,
    /// Dispatch stopped early because shutdown was requested
    pub interrupted: bool,
}

/// Drives one run: enumerate, dispatch to a bounded worker pool, checkpoint every outcome.
///
/// The checkpoint is the only state carried between runs. A unit still in flight when the
/// run ends is absent from it and gets processed again next time.
pub struct Orchestrator {
    config: EtlConfig,
    connector: Arc<dyn StoreConnector>,
    checkpoint: Arc<CheckpointStore>,
    shutdown: CancellationToken,
}

/// Book-keeping of the dispatch loop.
struct RunState {
    run_id: String,
    tracker: ProgressTracker,
    free_slots: Vec<usize>,
    spare_slot: usize,
    progress_interval: usize,
}

type TaskResult = Result<(usize, UnitOutcome), JoinError>;

impl Orchestrator {
    pub fn new(
        config: EtlConfig,
        connector: Arc<dyn StoreConnector>,
        checkpoint: Arc<CheckpointStore>,
        shutdown: CancellationToken,
    ) -> Self {
        Self { config, connector, checkpoint, shutdown }
    }

    /// run - Process every unit the checkpoint does not already report as terminal
    ///
    /// # Errors
    /// * The data source is unreachable or enumeration fails (nothing has been dispatched)
    /// * A checkpoint write fails (the run stops; in-flight units are rerun next time)
    pub async fn run(&self) -> EtlResult<RunSummary> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("run", run_id = %run_id);
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&self, run_id: String) -> EtlResult<RunSummary> {
        info!(
            worker_count = self.config.service.worker_count,
            batch_size = self.config.storage.batch_size,
            builder = self.config.storage.builder.build().name(),
            output_dir = %self.config.storage.output_dir.display(),
            "Starting run"
        );

        let store = self.connector.connect().await?;
        store.ping().await?;

        let units: Vec<WorkUnit> =
            source::enumerate(store.as_ref(), &self.config.source, self.checkpoint.clone()).await?.try_collect().await?;
        record_units_enumerated(&run_id, units.len());

        let worker_count = self.config.service.worker_count.max(1);
        let mut state = RunState {
            run_id,
            tracker: ProgressTracker::new(units.len()),
            free_slots: (0..worker_count).rev().collect(),
            spare_slot: worker_count,
            progress_interval: self.config.service.progress_interval.max(1),
        };

        if units.is_empty() {
            let stats = self.checkpoint.stats();
            info!(completed = stats.completed, failed = stats.failed, "No work units left to process");
            return Ok(RunSummary { run_id: state.run_id, snapshot: state.tracker.snapshot(), interrupted: false });
        }

        let settings = writer_settings(&self.config.storage);
        let fallback = self.config.source.fallback_dimensions();
        let mut tasks: JoinSet<(usize, UnitOutcome)> = JoinSet::new();
        let mut interrupted = false;

        'chunks: for chunk in units.chunks(self.config.service.chunk_size()) {
            if self.shutdown.is_cancelled() {
                interrupted = true;
                break;
            }
            let analyses = fetch_chunk_analyses(store.as_ref(), chunk).await?;
            debug!(units = chunk.len(), analyses = analyses.len(), "Dispatching chunk");

            for unit in chunk {
                while state.free_slots.is_empty() {
                    tokio::select! {
                        biased;

                        _ = self.shutdown.cancelled() => {
                            interrupted = true;
                            break 'chunks;
                        }
                        Some(result) = tasks.join_next() => {
                            self.handle_result(result, &mut state)?;
                        }
                    }
                }
                if self.shutdown.is_cancelled() {
                    interrupted = true;
                    break 'chunks;
                }
                let Some(slot) = state.free_slots.pop() else { continue };

                let worker = Worker::new(
                    format!("worker_{}", slot),
                    self.connector.clone(),
                    self.checkpoint.clone(),
                    settings.clone(),
                    fallback,
                );
                let analysis = unit.analysis().and_then(|reference| analyses.get(&reference.id_text()).cloned());
                let unit = unit.clone();
                tasks.spawn(async move { (slot, run_guarded(worker, unit, analysis).await) });
            }
        }

        if !interrupted {
            while !tasks.is_empty() {
                tokio::select! {
                    biased;

                    _ = self.shutdown.cancelled() => {
                        interrupted = true;
                        break;
                    }
                    Some(result) = tasks.join_next() => {
                        self.handle_result(result, &mut state)?;
                    }
                }
            }
        }

        if !tasks.is_empty() {
            self.drain_in_flight(&mut tasks, &mut state).await?;
        }

        let snapshot = state.tracker.snapshot();
        record_progress(&state.run_id, &snapshot);
        if interrupted {
            warn!(processed = snapshot.processed, total = snapshot.total, "Run interrupted, remaining units stay pending");
        } else {
            info!(
                completed = snapshot.completed,
                failed = snapshot.failed,
                records = snapshot.records,
                batches = snapshot.batches,
                elapsed_seconds = snapshot.elapsed.as_secs(),
                "Run finished"
            );
        }
        Ok(RunSummary { run_id: state.run_id, snapshot, interrupted })
    }

    /// Give in-flight units the shutdown timeout to finish, then abort the rest.
    async fn drain_in_flight(
        &self,
        tasks: &mut JoinSet<(usize, UnitOutcome)>,
        state: &mut RunState,
    ) -> EtlResult<()> {
        let timeout_secs = self.config.service.shutdown_timeout_seconds;
        info!(in_flight = tasks.len(), timeout_secs, "Shutdown requested, waiting for in-flight units");

        let drained = tokio::time::timeout(Duration::from_secs(timeout_secs), async {
            while let Some(result) = tasks.join_next().await {
                self.handle_result(result, state)?;
            }
            EtlResult::Ok(())
        })
        .await;

        match drained {
            Ok(result) => result,
            Err(_) => {
                warn!(aborted = tasks.len(), "Shutdown timeout reached, aborting in-flight units");
                tasks.abort_all();
                while tasks.join_next().await.is_some() {}
                Ok(())
            }
        }
    }

    /// Persist one outcome. A checkpoint write failure is fatal to the run.
    fn handle_result(&self, result: TaskResult, state: &mut RunState) -> EtlResult<()> {
        let (slot, outcome) = match result {
            Ok(joined) => joined,
            Err(e) => {
                // cancelled tasks never report an outcome; keep the pool at full size
                error!(error = %e, "Worker task ended without an outcome");
                state.free_slots.push(state.spare_slot);
                state.spare_slot += 1;
                return Ok(());
            }
        };
        state.free_slots.push(slot);

        match &outcome.status {
            UnitStatus::Completed => self.checkpoint.mark_completed(&outcome.key)?,
            UnitStatus::Failed(reason) => self.checkpoint.mark_failed(&outcome.key, reason)?,
        }
        record_unit_outcome(&outcome);
        state.tracker.record(&outcome);

        let processed = state.tracker.processed();
        if processed % state.progress_interval == 0 {
            record_progress(&state.run_id, &state.tracker.snapshot());
        }
        Ok(())
    }
}

/// Run a worker, turning a panic into a failed outcome.
async fn run_guarded(worker: Worker, unit: WorkUnit, analysis: Option<Document>) -> UnitOutcome {
    let result = AssertUnwindSafe(worker.process(&unit, analysis)).catch_unwind().await;
    result.unwrap_or_else(|panic| {
        let message = extract_panic_message(&panic);
        error!(unit = %unit, worker_id = %worker.id(), panic = %message, "Worker panicked");
        UnitOutcome::failed(unit.key(), worker.id(), format!("worker panicked: {}", message))
    })
}

fn extract_panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    panic
        .downcast_ref::<String>()
        .map(|s| s.as_str())
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("Unknown panic")
        .to_string()
}

fn writer_settings(storage: &StorageConfig) -> WriterSettings {
    WriterSettings {
        output_root: storage.output_dir.clone(),
        batch_size: storage.batch_size,
        compression_level: storage.compression_level,
        builder: storage.builder.build(),
    }
}

/// Full analysis documents of a chunk, keyed by `_id` text.
async fn fetch_chunk_analyses(
    store: &dyn AnnotationStore,
    chunk: &[WorkUnit],
) -> EtlResult<HashMap<String, Document>> {
    let ids: Vec<Bson> = chunk.iter().filter_map(|unit| unit.analysis()).map(|reference| reference.id.clone()).collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let documents = store.fetch_analyses(ids).await?;
    Ok(documents
        .into_iter()
        .filter_map(|doc| {
            let id = doc.get("_id").map(|id| text(id).unwrap_or_else(|| id.to_string()))?;
            Some((id, doc))
        })
        .collect())
}
