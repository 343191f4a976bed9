//! Pluggable Turtle document layouts.

pub mod camic;
pub mod halcyon;
pub mod minimal;

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use clap::ValueEnum;
use oxrdf::NamedNode;
use serde::{Deserialize, Serialize};

use super::turtle::{iri, iri_component, TurtleDocument};
use super::{batch_file_name, WriterError};
use crate::types::constant::COLLECTION_IRI_PREFIX;
use crate::types::{AnalysisMetadata, FeatureMember, WorkUnit};

pub use camic::CamicBuilder;
pub use halcyon::HalcyonBuilder;
pub use minimal::MinimalBuilder;

/// Everything a builder may put in a document header.
#[derive(Debug, Clone, Copy)]
pub struct BatchContext<'a> {
    pub unit: &'a WorkUnit,
    pub analysis: Option<&'a AnalysisMetadata>,
    pub batch_number: u32,
    pub generated_at: DateTime<Utc>,
}

impl BatchContext<'_> {
    pub fn generated_at_text(&self) -> String {
        self.generated_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Absolute IRI of the batch's feature collection: the unit's identity segments and
    /// the batch file name under a fixed URN prefix.
    pub fn collection_iri(&self) -> Result<NamedNode, WriterError> {
        let segments: Vec<String> = self.unit.output_segments().iter().map(|s| iri_component(s)).collect();
        iri(format!("{}{}/{}", COLLECTION_IRI_PREFIX, segments.join("/"), batch_file_name(self.batch_number)))
    }

    pub(crate) fn require_analysis(&self, builder: &'static str) -> Result<&AnalysisMetadata, WriterError> {
        self.analysis.ok_or_else(|| WriterError::MissingAnalysis { builder, unit: self.unit.key().to_string() })
    }
}

/// Builds the triples of one self-contained Turtle document for a batch of members.
pub trait DocumentBuilder: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether documents need the unit's analysis metadata
    fn requires_analysis(&self) -> bool;

    fn render(&self, context: &BatchContext<'_>, members: &[FeatureMember]) -> Result<TurtleDocument, WriterError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BuilderKind {
    /// Halcyon/PROV-O layout with typed algorithm parameters
    #[default]
    Halcyon,
    /// Legacy caMicroscope layout
    Camic,
    /// Bare feature collection for marks without analysis context
    Minimal,
}

impl BuilderKind {
    pub fn build(self) -> Arc<dyn DocumentBuilder> {
        match self {
            BuilderKind::Halcyon => Arc::new(HalcyonBuilder),
            BuilderKind::Camic => Arc::new(CamicBuilder),
            BuilderKind::Minimal => Arc::new(MinimalBuilder),
        }
    }
}
