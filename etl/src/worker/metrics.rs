/// Pipeline metrics emitted as structured log events.
///
/// Every event carries a `metric` field naming the series, so log aggregation can count
/// or plot them without a metrics backend.
use std::sync::LazyLock;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::types::{ProgressSnapshot, UnitOutcome, UnitStatus};

/// Metric names for pipeline operations
pub struct PipelineMetrics {
    /// Counter for units that finished with every batch written
    pub units_completed: &'static str,
    /// Counter for units reported as failed
    pub units_failed: &'static str,
    /// Counter for marks written to batch files
    pub records_written: &'static str,
    /// Counter for batch files sealed
    pub batches_written: &'static str,
    /// Histogram for wall time spent on one unit
    pub unit_duration: &'static str,
    /// Counter for marks dropped by the geometry codec
    pub marks_skipped: &'static str,
    /// Gauge for processed / total units of the current run
    pub run_progress: &'static str,
    /// Counter for units found still to process at startup
    pub units_enumerated: &'static str,
}

pub static PIPELINE_METRICS: LazyLock<PipelineMetrics> = LazyLock::new(|| PipelineMetrics {
    units_completed: "etl.units.completed",
    units_failed: "etl.units.failed",
    records_written: "etl.records.written",
    batches_written: "etl.batches.written",
    unit_duration: "etl.unit.duration",
    marks_skipped: "etl.marks.skipped",
    run_progress: "etl.run.progress",
    units_enumerated: "etl.units.enumerated",
});

/// Record the terminal outcome of one unit
pub fn record_unit_outcome(outcome: &UnitOutcome) {
    match &outcome.status {
        UnitStatus::Completed => {
            info!(
                metric = PIPELINE_METRICS.units_completed,
                unit = %outcome.key,
                worker_id = %outcome.worker_id,
                "Unit completed"
            );
            info!(metric = PIPELINE_METRICS.records_written, unit = %outcome.key, value = outcome.records, "Records written");
            info!(metric = PIPELINE_METRICS.batches_written, unit = %outcome.key, value = outcome.batches, "Batches written");
        }
        UnitStatus::Failed(reason) => {
            warn!(
                metric = PIPELINE_METRICS.units_failed,
                unit = %outcome.key,
                worker_id = %outcome.worker_id,
                reason = %reason,
                "Unit failed"
            );
        }
    }
}

/// Record how long a worker spent on one unit
pub fn record_unit_duration(key: &str, elapsed: Duration) {
    debug!(
        metric = PIPELINE_METRICS.unit_duration,
        unit = %key,
        duration_seconds = elapsed.as_secs_f64(),
        "Unit duration"
    );
}

/// Record marks the geometry codec rejected within one unit
pub fn record_marks_skipped(key: &str, skipped: u64) {
    if skipped > 0 {
        debug!(metric = PIPELINE_METRICS.marks_skipped, unit = %key, value = skipped, "Marks skipped");
    }
}

/// Record the number of units the run will dispatch
pub fn record_units_enumerated(run_id: &str, total: usize) {
    info!(metric = PIPELINE_METRICS.units_enumerated, run_id = %run_id, value = total, "Work units enumerated");
}

/// Periodic progress report
pub fn record_progress(run_id: &str, snapshot: &ProgressSnapshot) {
    info!(
        metric = PIPELINE_METRICS.run_progress,
        run_id = %run_id,
        processed = snapshot.processed,
        total = snapshot.total,
        completed = snapshot.completed,
        failed = snapshot.failed,
        records = snapshot.records,
        records_per_sec = %format!("{:.1}", snapshot.records_per_sec),
        eta_hours = %snapshot.eta_hours().map(|h| format!("{:.2}", h)).unwrap_or_else(|| "unknown".to_string()),
        "Progress {}/{} ({:.1}%)",
        snapshot.processed,
        snapshot.total,
        snapshot.percent()
    );
}
