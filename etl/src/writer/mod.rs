pub mod builder;
pub mod turtle;
pub mod vocab;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use flate2::write::GzEncoder;
use flate2::Compression;
use thiserror::Error;
use tracing::debug;

pub use builder::{BatchContext, BuilderKind, DocumentBuilder};

use crate::types::constant::{BATCH_FILE_EXTENSION, BATCH_FILE_PREFIX};
use crate::types::{AnalysisMetadata, FeatureMember, WorkUnit};

#[derive(Error, Debug)]
pub enum WriterError {
    #[error("Failed to write batch file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid IRI in Turtle document: {0}")]
    Iri(#[from] oxrdf::IriParseError),

    #[error("Failed to serialize Turtle document: {0}")]
    Serialize(#[from] std::io::Error),

    #[error("The {builder} document builder needs analysis metadata but unit {unit} has none")]
    MissingAnalysis { builder: &'static str, unit: String },

    #[error("Batch write task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Output settings shared by every writer of a run.
#[derive(Clone)]
pub struct WriterSettings {
    pub output_root: PathBuf,
    pub batch_size: usize,
    pub compression_level: u32,
    pub builder: Arc<dyn DocumentBuilder>,
}

impl std::fmt::Debug for WriterSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriterSettings")
            .field("output_root", &self.output_root)
            .field("batch_size", &self.batch_size)
            .field("compression_level", &self.compression_level)
            .field("builder", &self.builder.name())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub records: u64,
    pub batches: u32,
}

/// Accumulates one unit's converted marks and seals them into numbered batch files.
///
/// Batch numbers start at 1 and increase by one per file. Members keep the order they
/// were pushed in. Nothing is written for a unit without members.
#[derive(Debug)]
pub struct BatchWriter {
    unit: WorkUnit,
    analysis: Option<AnalysisMetadata>,
    settings: WriterSettings,
    output_dir: PathBuf,
    pending: Vec<FeatureMember>,
    next_batch: u32,
    summary: BatchSummary,
}

impl BatchWriter {
    pub fn new(
        unit: WorkUnit,
        analysis: Option<AnalysisMetadata>,
        settings: WriterSettings,
    ) -> Result<Self, WriterError> {
        if settings.builder.requires_analysis() && analysis.is_none() {
            return Err(WriterError::MissingAnalysis { builder: settings.builder.name(), unit: unit.key().to_string() });
        }
        let output_dir = unit.output_dir(&settings.output_root);
        Ok(Self {
            pending: Vec::with_capacity(settings.batch_size.min(10_000)),
            unit,
            analysis,
            settings,
            output_dir,
            next_batch: 1,
            summary: BatchSummary::default(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub async fn push(&mut self, member: FeatureMember) -> Result<(), WriterError> {
        self.pending.push(member);
        if self.pending.len() >= self.settings.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    /// Flush the trailing partial batch and report totals.
    pub async fn finish(mut self) -> Result<BatchSummary, WriterError> {
        if !self.pending.is_empty() {
            self.flush().await?;
        }
        Ok(self.summary)
    }

    async fn flush(&mut self) -> Result<(), WriterError> {
        let members = std::mem::take(&mut self.pending);
        let context = BatchContext {
            unit: &self.unit,
            analysis: self.analysis.as_ref(),
            batch_number: self.next_batch,
            generated_at: Utc::now(),
        };
        let document = self.settings.builder.render(&context, &members)?.to_bytes()?;

        let path = self.output_dir.join(batch_file_name(self.next_batch));
        let level = Compression::new(self.settings.compression_level);
        let target = path.clone();
        tokio::task::spawn_blocking(move || write_compressed(&target, &document, level)).await??;

        debug!(unit = %self.unit, batch = self.next_batch, members = members.len(), path = %path.display(), "Batch written");
        self.summary.records += members.len() as u64;
        self.summary.batches += 1;
        self.next_batch += 1;
        Ok(())
    }
}

/// `batch_000001.ttl.gz` for batch 1.
pub fn batch_file_name(batch_number: u32) -> String {
    format!("{}{:06}.{}", BATCH_FILE_PREFIX, batch_number, BATCH_FILE_EXTENSION)
}

/// Gzip `contents` into a `.tmp` sibling of `path`, then rename it into place.
fn write_compressed(path: &Path, contents: &[u8], level: Compression) -> Result<(), WriterError> {
    let io_err = |source| WriterError::Io { path: path.to_path_buf(), source };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    let file = File::create(&tmp).map_err(io_err)?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), level);
    encoder.write_all(contents).map_err(io_err)?;
    let file = encoder.finish().map_err(io_err)?.into_inner().map_err(|e| io_err(e.into_error()))?;
    file.sync_all().map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)
}
