use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, warn};

use super::error::{CheckpointError, IoContext};
use super::io::{append_line, read_lines, remove_if_exists};
use super::rotation::{self, RotationPolicy};
use crate::types::constant::{ARCHIVE_DIR, COMPLETED_FILE, FAILED_FILE, IN_PROGRESS_FILE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckpointStats {
    pub completed: usize,
    pub failed: usize,
}

/// One line of `in_progress.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InProgressEntry {
    pub key: String,
    pub worker_id: String,
    pub started_at: String,
}

#[derive(Debug, Default)]
struct CheckpointState {
    completed: HashSet<String>,
    failed: HashMap<String, String>,
    /// Entries and bytes in the live completed file, archives excluded
    live_entries: usize,
    live_bytes: u64,
}

/// Append-only checkpoint files with an in-memory index of terminal keys.
///
/// Completed and failed are both terminal: a key in either set is never handed out again.
/// In-progress lines are a diagnostic side channel and play no part in that decision.
#[derive(Debug)]
pub struct CheckpointStore {
    dir: PathBuf,
    state: RwLock<CheckpointState>,
    append_lock: Mutex<()>,
    rotation: Option<RotationPolicy>,
}

impl CheckpointStore {
    /// Open for a run: replay terminal files, cut torn trailing lines and clear the
    /// in-progress file left by a previous run.
    pub fn open(dir: impl Into<PathBuf>, rotation: Option<RotationPolicy>) -> Result<Self, CheckpointError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).at(&dir)?;
        let store = Self::load(dir, rotation, true)?;
        remove_if_exists(&store.dir.join(IN_PROGRESS_FILE))?;
        Ok(store)
    }

    /// Open without repairing or clearing anything, for status queries and
    /// [`requeue_failed`](Self::requeue_failed) against a directory a run may be using.
    pub fn inspect(dir: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        Self::load(dir.into(), None, false)
    }

    fn load(dir: PathBuf, rotation: Option<RotationPolicy>, repair: bool) -> Result<Self, CheckpointError> {
        let mut state = CheckpointState::default();
        state.completed.extend(rotation::archived_keys(&dir)?);
        let archived = state.completed.len();

        let (live, live_bytes) = read_lines(&dir.join(COMPLETED_FILE), repair)?;
        state.live_entries = live.len();
        state.live_bytes = live_bytes;
        state.completed.extend(live);

        for line in read_lines(&dir.join(FAILED_FILE), repair)?.0 {
            let (key, reason) = line.split_once('|').unwrap_or((line.as_str(), ""));
            state.failed.insert(key.to_string(), reason.to_string());
        }

        info!(
            checkpoint_dir = %dir.display(),
            completed = state.completed.len(),
            archived,
            failed = state.failed.len(),
            "Checkpoint state loaded"
        );
        Ok(Self { dir, state: RwLock::new(state), append_lock: Mutex::new(()), rotation })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// True iff `key` has neither a completed nor a failed entry.
    pub fn should_process(&self, key: &str) -> bool {
        let state = self.read_state();
        !state.completed.contains(key) && !state.failed.contains_key(key)
    }

    /// Record `key` as completed. A second call for the same key writes nothing.
    pub fn mark_completed(&self, key: &str) -> Result<(), CheckpointError> {
        validate_key(key)?;
        let _guard = self.append_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.read_state().completed.contains(key) {
            return Ok(());
        }

        let line = format!("{}\n", key);
        append_line(&self.dir.join(COMPLETED_FILE), &line)?;
        {
            let mut state = self.write_state();
            state.completed.insert(key.to_string());
            state.live_entries += 1;
            state.live_bytes += line.len() as u64;
        }

        self.rotate_if_needed();
        Ok(())
    }

    /// Record `key` as failed with `reason`. Keys that are already terminal are left alone.
    pub fn mark_failed(&self, key: &str, reason: &str) -> Result<(), CheckpointError> {
        validate_key(key)?;
        let _guard = self.append_lock.lock().unwrap_or_else(PoisonError::into_inner);
        {
            let state = self.read_state();
            if state.completed.contains(key) || state.failed.contains_key(key) {
                return Ok(());
            }
        }

        let reason = single_line(reason);
        append_line(&self.dir.join(FAILED_FILE), &format!("{}|{}\n", key, reason))?;
        self.write_state().failed.insert(key.to_string(), reason);
        Ok(())
    }

    /// Advisory marker. Callers log failures and carry on.
    pub fn mark_in_progress(&self, key: &str, worker_id: &str) -> Result<(), CheckpointError> {
        validate_key(key)?;
        let line = format!(
            "{}|{}|{}\n",
            key,
            single_line(worker_id).replace('|', "_"),
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        let _guard = self.append_lock.lock().unwrap_or_else(PoisonError::into_inner);
        append_line(&self.dir.join(IN_PROGRESS_FILE), &line)
    }

    pub fn stats(&self) -> CheckpointStats {
        let state = self.read_state();
        CheckpointStats { completed: state.completed.len(), failed: state.failed.len() }
    }

    /// Failed keys with their reasons, sorted by key.
    pub fn failed_entries(&self) -> Vec<(String, String)> {
        let mut entries: Vec<_> = self.read_state().failed.iter().map(|(k, r)| (k.clone(), r.clone())).collect();
        entries.sort();
        entries
    }

    /// In-progress markers whose key has not reached a terminal state yet.
    pub fn in_progress_entries(&self) -> Result<Vec<InProgressEntry>, CheckpointError> {
        let (lines, _) = read_lines(&self.dir.join(IN_PROGRESS_FILE), false)?;
        Ok(lines
            .iter()
            .filter_map(|line| {
                let mut parts = line.splitn(3, '|');
                Some(InProgressEntry {
                    key: parts.next()?.to_string(),
                    worker_id: parts.next()?.to_string(),
                    started_at: parts.next().unwrap_or_default().to_string(),
                })
            })
            .filter(|entry| self.should_process(&entry.key))
            .collect())
    }

    /// Move the failed file into the archive so its keys become eligible again.
    /// Returns how many keys were requeued.
    pub fn requeue_failed(&self) -> Result<usize, CheckpointError> {
        let _guard = self.append_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let failed_path = self.dir.join(FAILED_FILE);
        if !failed_path.exists() {
            return Ok(0);
        }

        let archive_dir = self.dir.join(ARCHIVE_DIR);
        fs::create_dir_all(&archive_dir).at(&archive_dir)?;
        let target = archive_dir.join(format!("failed_analyses.{}.txt", Utc::now().format("%Y%m%dT%H%M%S%.3fZ")));
        fs::rename(&failed_path, &target).at(&failed_path)?;

        let mut state = self.write_state();
        let requeued = state.failed.len();
        state.failed.clear();
        info!(requeued, archived_to = %target.display(), "Failed work units requeued");
        Ok(requeued)
    }

    /// Runs with the append lock held. The completion line is already durable, so a
    /// failed rotation is only logged.
    fn rotate_if_needed(&self) {
        let Some(policy) = &self.rotation else { return };
        let (entries, bytes) = {
            let state = self.read_state();
            (state.live_entries, state.live_bytes)
        };
        if !policy.should_rotate(entries, bytes) {
            return;
        }

        match rotation::rotate(&self.dir, policy) {
            Ok(Some(report)) => {
                let mut state = self.write_state();
                state.live_entries = report.kept_entries;
                state.live_bytes = report.kept_bytes;
                info!(
                    archive = %report.archive.file_name,
                    archived_entries = report.archive.entries,
                    kept_entries = report.kept_entries,
                    "Completed checkpoint file rotated"
                );
            }
            Ok(None) => debug!("Nothing to rotate"),
            Err(e) => warn!(error = %e, "Checkpoint rotation failed, live file left in place"),
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, CheckpointState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, CheckpointState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn validate_key(key: &str) -> Result<(), CheckpointError> {
    if key.is_empty() || key.contains(['|', '\n', '\r']) {
        return Err(CheckpointError::InvalidKey(key.to_string()));
    }
    Ok(())
}

fn single_line(text: &str) -> String {
    text.replace(['\n', '\r'], " ")
}
