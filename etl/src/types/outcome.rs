use std::fmt;

/// Terminal status reported by a worker for one unit.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitStatus {
    Completed,
    Failed(String),
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitStatus::Completed => write!(f, "completed"),
            UnitStatus::Failed(_) => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitOutcome {
    pub key: String,
    pub worker_id: String,
    pub status: UnitStatus,
    /// Marks written to batch files
    pub records: u64,
    pub batches: u32,
}

impl UnitOutcome {
    pub fn completed(key: impl Into<String>, worker_id: impl Into<String>, records: u64, batches: u32) -> Self {
        Self { key: key.into(), worker_id: worker_id.into(), status: UnitStatus::Completed, records, batches }
    }

    pub fn failed(key: impl Into<String>, worker_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            worker_id: worker_id.into(),
            status: UnitStatus::Failed(reason.into()),
            records: 0,
            batches: 0,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.status, UnitStatus::Completed)
    }
}
