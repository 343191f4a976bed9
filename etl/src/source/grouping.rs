use std::collections::HashSet;
use std::sync::Arc;

use futures::{future, StreamExt, TryStreamExt};
use tracing::{debug, trace};

use super::WorkUnitStream;
use crate::checkpoint::CheckpointStore;
use crate::core::client::database::AnnotationStore;
use crate::error::{EtlError, EtlResult};
use crate::types::{AnalysisRef, MarkLink, WorkUnit};

/// One unit per distinct grouping key in the analysis catalog.
///
/// Only the projected reference fields are read here; the orchestrator fetches full
/// analysis documents chunk by chunk.
pub async fn analysis_units(
    store: &dyn AnnotationStore,
    link: MarkLink,
    include_slide: bool,
    checkpoint: Arc<CheckpointStore>,
) -> EtlResult<WorkUnitStream> {
    let analyses = store.stream_analyses(AnalysisRef::projection()).await?;
    let mut seen = HashSet::new();

    let units = analyses.map_err(EtlError::from).try_filter_map(move |doc| {
        let unit = match AnalysisRef::from_document(&doc) {
            Some(reference) => Some(WorkUnit::for_analysis(reference, link, include_slide)),
            None => {
                debug!(analysis_id = ?doc.get("_id"), "Skipping analysis without execution_id or imageid");
                None
            }
        };
        let unit = unit.filter(|unit| {
            if !seen.insert(unit.key().to_string()) {
                trace!(unit = %unit, "Duplicate grouping key");
                return false;
            }
            checkpoint.should_process(unit.key())
        });
        future::ready(Ok(unit))
    });
    Ok(units.boxed())
}
