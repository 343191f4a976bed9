use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use super::error::{CheckpointError, IoContext};
use super::io::{read_lines, write_atomic};
use crate::types::constant::{ARCHIVE_DIR, ARCHIVE_INDEX_FILE, COMPLETED_FILE};

fn default_keep_tail() -> usize {
    1000
}

fn default_compress() -> bool {
    true
}

/// When and how the completed file is archived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationPolicy {
    /// Rotate once the live file reaches this size
    #[serde(default)]
    pub max_bytes: Option<u64>,
    /// Rotate once the live file holds this many entries
    #[serde(default)]
    pub max_entries: Option<usize>,
    /// Most recent entries copied back into the fresh live file
    #[serde(default = "default_keep_tail")]
    pub keep_tail: usize,
    #[serde(default = "default_compress")]
    pub compress: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self { max_bytes: None, max_entries: None, keep_tail: default_keep_tail(), compress: default_compress() }
    }
}

impl RotationPolicy {
    pub fn should_rotate(&self, live_entries: usize, live_bytes: u64) -> bool {
        // a live file holding only the retained tail would rotate forever
        if live_entries <= self.keep_tail {
            return false;
        }
        self.max_bytes.is_some_and(|max| live_bytes >= max) || self.max_entries.is_some_and(|max| live_entries >= max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub file_name: String,
    pub entries: usize,
    pub compressed: bool,
    pub created_at: DateTime<Utc>,
}

/// `archive/index.json`. Only archives listed here are replayed on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchiveIndex {
    pub archives: Vec<ArchiveRecord>,
}

impl ArchiveIndex {
    pub fn load(checkpoint_dir: &Path) -> Result<Self, CheckpointError> {
        let path = checkpoint_dir.join(ARCHIVE_DIR).join(ARCHIVE_INDEX_FILE);
        match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| CheckpointError::ArchiveIndex { path, source }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(CheckpointError::Io { path, source: e }),
        }
    }

    fn save(&self, checkpoint_dir: &Path) -> Result<(), CheckpointError> {
        let path = checkpoint_dir.join(ARCHIVE_DIR).join(ARCHIVE_INDEX_FILE);
        let bytes =
            serde_json::to_vec_pretty(self).map_err(|source| CheckpointError::ArchiveIndex { path: path.clone(), source })?;
        write_atomic(&path, &bytes)
    }

    pub fn total_entries(&self) -> usize {
        self.archives.iter().map(|a| a.entries).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RotationReport {
    pub archive: ArchiveRecord,
    pub kept_entries: usize,
    pub kept_bytes: u64,
}

/// Archive the whole live completed file, register it in the index, then reset the live
/// file to its last `keep_tail` entries.
///
/// Each step is an atomic rename and the steps are ordered so that every key is always
/// reachable from the live file or an indexed archive. Tail entries end up in both places.
pub fn rotate(checkpoint_dir: &Path, policy: &RotationPolicy) -> Result<Option<RotationReport>, CheckpointError> {
    let live_path = checkpoint_dir.join(COMPLETED_FILE);
    let (lines, _) = read_lines(&live_path, false)?;
    if lines.is_empty() {
        return Ok(None);
    }

    let archive_dir = checkpoint_dir.join(ARCHIVE_DIR);
    fs::create_dir_all(&archive_dir).at(&archive_dir)?;
    let mut index = ArchiveIndex::load(checkpoint_dir)?;

    let created_at = Utc::now();
    let file_name = format!(
        "completed_analyses.{:06}.{}.txt{}",
        index.archives.len() + 1,
        created_at.format("%Y%m%dT%H%M%SZ"),
        if policy.compress { ".gz" } else { "" }
    );
    let archive_path = archive_dir.join(&file_name);
    let body = join_lines(&lines);
    let contents = if policy.compress { gzip(body.as_bytes()).at(&archive_path)? } else { body.into_bytes() };
    write_atomic(&archive_path, &contents)?;

    let record = ArchiveRecord { file_name, entries: lines.len(), compressed: policy.compress, created_at };
    index.archives.push(record.clone());
    index.save(checkpoint_dir)?;

    let tail = &lines[lines.len().saturating_sub(policy.keep_tail)..];
    let tail_body = join_lines(tail);
    write_atomic(&live_path, tail_body.as_bytes())?;

    Ok(Some(RotationReport { archive: record, kept_entries: tail.len(), kept_bytes: tail_body.len() as u64 }))
}

/// Every key recorded in indexed archives.
pub fn archived_keys(checkpoint_dir: &Path) -> Result<Vec<String>, CheckpointError> {
    let index = ArchiveIndex::load(checkpoint_dir)?;
    let mut keys = Vec::with_capacity(index.total_entries());
    for record in &index.archives {
        let path = checkpoint_dir.join(ARCHIVE_DIR).join(&record.file_name);
        let bytes = fs::read(&path).at(&path)?;
        let body = if record.compressed {
            let mut body = String::new();
            GzDecoder::new(bytes.as_slice()).read_to_string(&mut body).at(&path)?;
            body
        } else {
            String::from_utf8_lossy(&bytes).into_owned()
        };
        keys.extend(body.lines().map(str::trim_end).filter(|l| !l.is_empty()).map(str::to_string));
    }
    Ok(keys)
}

fn join_lines(lines: &[String]) -> String {
    let mut body = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
    for line in lines {
        body.push_str(line);
        body.push('\n');
    }
    body
}

fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}
