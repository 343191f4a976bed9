use std::sync::Arc;
use std::time::Instant;

use futures::TryStreamExt;
use mongodb::bson::Document;
use tracing::{debug, info_span, trace, warn, Instrument};

use super::metrics::{record_marks_skipped, record_unit_duration};
use crate::checkpoint::CheckpointStore;
use crate::core::client::database::StoreConnector;
use crate::error::{EtlError, EtlResult};
use crate::types::{AnalysisMetadata, FeatureMember, ImageDimensions, UnitOutcome, WorkUnit};
use crate::writer::{BatchSummary, BatchWriter, WriterSettings};

/// Turns one work unit into batch files.
///
/// A worker opens its own data source connection per unit and drops it (together with the
/// mark cursor) on every exit path. It never retries: any error becomes a failed outcome.
pub struct Worker {
    id: String,
    connector: Arc<dyn StoreConnector>,
    checkpoint: Arc<CheckpointStore>,
    settings: WriterSettings,
    fallback: ImageDimensions,
}

impl Worker {
    pub fn new(
        id: impl Into<String>,
        connector: Arc<dyn StoreConnector>,
        checkpoint: Arc<CheckpointStore>,
        settings: WriterSettings,
        fallback: ImageDimensions,
    ) -> Self {
        Self { id: id.into(), connector, checkpoint, settings, fallback }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// process - Stream the unit's marks through the codec into the batch writer
    ///
    /// `analysis` is the full analysis document for analysis-scoped units, fetched by the
    /// orchestrator for the whole dispatch chunk.
    pub async fn process(&self, unit: &WorkUnit, analysis: Option<Document>) -> UnitOutcome {
        let span = info_span!("unit", unit = %unit.key(), worker_id = %self.id);
        async move {
            let started = Instant::now();
            let outcome = match self.run(unit, analysis).await {
                Ok(summary) => {
                    debug!(records = summary.records, batches = summary.batches, "Unit processed");
                    UnitOutcome::completed(unit.key(), &self.id, summary.records, summary.batches)
                }
                Err(e) => UnitOutcome::failed(unit.key(), &self.id, e.to_string()),
            };
            record_unit_duration(unit.key(), started.elapsed());
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run(&self, unit: &WorkUnit, analysis: Option<Document>) -> EtlResult<BatchSummary> {
        let store = self.connector.connect().await?;

        if let Err(e) = self.checkpoint.mark_in_progress(unit.key(), &self.id) {
            warn!(error = %e, "Failed to record in-progress entry");
        }

        let metadata = match (unit.analysis(), analysis) {
            (_, Some(doc)) => Some(AnalysisMetadata::from_document(&doc, self.fallback)?),
            (Some(reference), None) => {
                return Err(EtlError::WorkerError(format!("analysis document {} not found", reference.id_text())));
            }
            (None, None) => None,
        };
        let dimensions = metadata.as_ref().map_or(self.fallback, |m| m.dimensions);

        let mut writer = BatchWriter::new(unit.clone(), metadata, self.settings.clone())?;
        let mut marks = store.stream_marks(unit.mark_filter().clone()).await?;

        let mut skipped = 0u64;
        while let Some(mark) = marks.try_next().await? {
            match FeatureMember::from_mark(&mark, dimensions) {
                Some(member) => writer.push(member).await?,
                None => {
                    skipped += 1;
                    trace!(mark_id = ?mark.get("_id"), "Skipping mark without a convertible polygon");
                }
            }
        }
        drop(marks);

        record_marks_skipped(unit.key(), skipped);
        Ok(writer.finish().await?)
    }
}
