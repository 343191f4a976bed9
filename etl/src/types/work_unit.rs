use std::fmt;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Bson, Document};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};

use super::constant::KEY_SEPARATOR;
use super::document::{text, text_at};

/// Escaped inside key components: the separator character, the checkpoint line delimiter
/// and the escape character itself. Line breaks are covered by `CONTROLS`.
const KEY_COMPONENT: &AsciiSet = &CONTROLS.add(b'%').add(b':').add(b'|');

/// Escaped inside output directory names.
const PATH_COMPONENT: &AsciiSet =
    &CONTROLS.add(b'%').add(b'/').add(b'\\').add(b':').add(b'*').add(b'?').add(b'"').add(b'<').add(b'>').add(b'|');

/// Field combination that ties a mark to the analysis it belongs to.
///
/// Deployments disagree on which one is authoritative, so it is always configured explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MarkLink {
    /// `provenance.analysis.execution_id` + `provenance.image.imageid` (+ `provenance.image.slide`)
    Provenance,
    /// `analysis_id` equal to the analysis document's `_id`
    AnalysisId,
}

/// Selects the marks swept by the range-shard strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RangeFilter {
    /// `analysis_id: null`. MongoDB also matches documents without the field.
    Null,
    /// `analysis_id: ""`
    Empty,
    /// `analysis_id` absent
    Missing,
}

impl RangeFilter {
    pub fn label(&self) -> &'static str {
        match self {
            RangeFilter::Null => "null",
            RangeFilter::Empty => "empty",
            RangeFilter::Missing => "missing",
        }
    }

    pub fn base_filter(&self) -> Document {
        match self {
            RangeFilter::Null => doc! { "analysis_id": Bson::Null },
            RangeFilter::Empty => doc! { "analysis_id": "" },
            RangeFilter::Missing => doc! { "analysis_id": { "$exists": false } },
        }
    }
}

/// Projection of one analysis catalog entry, enough to select its marks.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRef {
    pub id: Bson,
    pub execution_id: String,
    pub image_id: String,
    pub slide: Option<String>,
}

impl AnalysisRef {
    /// Fields fetched when enumerating the analysis catalog
    pub fn projection() -> Document {
        doc! { "_id": 1, "analysis.execution_id": 1, "image.imageid": 1, "image.slide": 1 }
    }

    /// Returns `None` when the entry lacks an execution id or image id.
    pub fn from_document(doc: &Document) -> Option<Self> {
        Some(Self {
            id: doc.get("_id")?.clone(),
            execution_id: text_at(doc, "analysis.execution_id")?,
            image_id: text_at(doc, "image.imageid")?,
            slide: text_at(doc, "image.slide"),
        })
    }

    /// Identifier text: hex for ObjectIds, the raw value otherwise.
    pub fn id_text(&self) -> String {
        text(&self.id).unwrap_or_else(|| self.id.to_string())
    }
}

/// Half-open `[start, end)` slice of the ObjectId space. `end: None` means unbounded.
#[derive(Debug, Clone, PartialEq)]
pub struct IdRange {
    pub filter: RangeFilter,
    pub index: usize,
    pub start: ObjectId,
    pub end: Option<ObjectId>,
}

impl IdRange {
    pub fn contains(&self, id: &ObjectId) -> bool {
        *id >= self.start && self.end.map_or(true, |end| *id < end)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnitScope {
    Analysis { reference: AnalysisRef, link: MarkLink },
    IdRange(IdRange),
}

/// One independently schedulable slice of the job. Immutable once enumerated.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkUnit {
    key: String,
    scope: UnitScope,
    mark_filter: Document,
    output_segments: Vec<String>,
}

impl WorkUnit {
    pub fn for_analysis(reference: AnalysisRef, link: MarkLink, include_slide: bool) -> Self {
        let slide = if include_slide { reference.slide.clone() } else { None };
        let (key, mark_filter, output_segments) = match link {
            MarkLink::Provenance => {
                let mut parts = vec![reference.execution_id.as_str(), reference.image_id.as_str()];
                let mut filter = doc! {
                    "provenance.analysis.execution_id": reference.execution_id.as_str(),
                    "provenance.image.imageid": reference.image_id.as_str(),
                };
                if let Some(slide) = slide.as_deref() {
                    parts.push(slide);
                    filter.insert("provenance.image.slide", slide);
                }
                let key = parts.iter().map(|p| key_component(p)).collect::<Vec<_>>().join(KEY_SEPARATOR);
                (key, filter, parts.iter().map(|p| p.to_string()).collect())
            }
            MarkLink::AnalysisId => {
                let id_text = reference.id_text();
                // marks store the reference either as an ObjectId or as its hex string
                let filter = doc! { "analysis_id": { "$in": [reference.id.clone(), id_text.as_str()] } };
                let segments = vec![reference.execution_id.clone(), reference.image_id.clone(), id_text.clone()];
                (key_component(&id_text), filter, segments)
            }
        };
        Self { key, scope: UnitScope::Analysis { reference, link }, mark_filter, output_segments }
    }

    pub fn for_range(range: IdRange) -> Self {
        let end = range.end.map_or_else(|| "end".to_string(), |end| end.to_hex());
        let key = format!("{}_{}_{}", range.filter.label(), range.start.to_hex(), end);

        let mut bounds = doc! { "$gte": range.start };
        if let Some(end) = range.end {
            bounds.insert("$lt", end);
        }
        let mut mark_filter = range.filter.base_filter();
        mark_filter.insert("_id", bounds);

        let output_segments = vec![range.filter.label().to_string(), format!("shard_{:02}", range.index)];
        Self { key, scope: UnitScope::IdRange(range), mark_filter, output_segments }
    }

    /// Stable checkpoint key
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn scope(&self) -> &UnitScope {
        &self.scope
    }

    /// Query selecting exactly this unit's marks
    pub fn mark_filter(&self) -> &Document {
        &self.mark_filter
    }

    pub fn analysis(&self) -> Option<&AnalysisRef> {
        match &self.scope {
            UnitScope::Analysis { reference, .. } => Some(reference),
            UnitScope::IdRange(_) => None,
        }
    }

    /// Raw identity segments, outermost first
    pub fn output_segments(&self) -> &[String] {
        &self.output_segments
    }

    /// Directory holding this unit's batch files
    pub fn output_dir(&self, root: &Path) -> PathBuf {
        self.output_segments.iter().fold(root.to_path_buf(), |dir, segment| dir.join(path_component(segment)))
    }
}

impl fmt::Display for WorkUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)
    }
}

/// Percent-encodes one key component. Distinct component lists always give distinct keys,
/// and values without reserved characters are kept as they are.
fn key_component(value: &str) -> String {
    utf8_percent_encode(value, KEY_COMPONENT).to_string()
}

/// Percent-encodes one directory name. The names `.` and `..` and the empty string, which
/// cannot be used as they are, get encodings no other value produces.
fn path_component(value: &str) -> String {
    match value {
        "" => "%".to_string(),
        "." => "%2E".to_string(),
        ".." => "%2E%2E".to_string(),
        other => utf8_percent_encode(other, PATH_COMPONENT).to_string(),
    }
}
