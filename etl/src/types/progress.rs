use std::time::{Duration, Instant};

use super::outcome::UnitOutcome;

/// Running totals for one orchestrator run. Never persisted.
#[derive(Debug)]
pub struct ProgressTracker {
    total_units: usize,
    completed: usize,
    failed: usize,
    records: u64,
    batches: u64,
    started: Instant,
}

/// Point-in-time view derived from a [`ProgressTracker`].
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub completed: usize,
    pub failed: usize,
    pub processed: usize,
    pub total: usize,
    pub remaining: usize,
    pub records: u64,
    pub batches: u64,
    pub elapsed: Duration,
    pub records_per_sec: f64,
    /// `remaining * elapsed / processed`; unknown until something finished
    pub eta: Option<Duration>,
}

impl ProgressSnapshot {
    pub fn eta_hours(&self) -> Option<f64> {
        self.eta.map(|eta| eta.as_secs_f64() / 3600.0)
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.processed as f64 * 100.0 / self.total as f64
        }
    }
}

impl ProgressTracker {
    pub fn new(total_units: usize) -> Self {
        Self { total_units, completed: 0, failed: 0, records: 0, batches: 0, started: Instant::now() }
    }

    pub fn record(&mut self, outcome: &UnitOutcome) {
        if outcome.is_completed() {
            self.completed += 1;
        } else {
            self.failed += 1;
        }
        self.records += outcome.records;
        self.batches += u64::from(outcome.batches);
    }

    pub fn processed(&self) -> usize {
        self.completed + self.failed
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        self.snapshot_at(self.started.elapsed())
    }

    pub fn snapshot_at(&self, elapsed: Duration) -> ProgressSnapshot {
        let processed = self.processed();
        let remaining = self.total_units.saturating_sub(processed);
        let secs = elapsed.as_secs_f64();
        let records_per_sec = if secs > 0.0 { self.records as f64 / secs } else { 0.0 };
        let eta = (processed > 0).then(|| elapsed.mul_f64(remaining as f64 / processed as f64));

        ProgressSnapshot {
            completed: self.completed,
            failed: self.failed,
            processed,
            total: self.total_units,
            remaining,
            records: self.records,
            batches: self.batches,
            elapsed,
            records_per_sec,
            eta,
        }
    }
}
