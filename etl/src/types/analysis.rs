use chrono::SecondsFormat;
use mongodb::bson::{Bson, Document};
use serde::{Deserialize, Serialize};

use super::constant::DEFAULT_IMAGE_DIMENSION;
use super::document::{lenient_number, lookup, number, text, text_at};
use crate::core::client::database::DatabaseError;

/// Pixel dimensions used to denormalize mark coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl Default for ImageDimensions {
    fn default() -> Self {
        Self { width: DEFAULT_IMAGE_DIMENSION, height: DEFAULT_IMAGE_DIMENSION }
    }
}

/// Typed algorithm parameter, rendered with the matching XSD datatype.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Header metadata extracted from a full analysis document.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisMetadata {
    pub id: String,
    pub execution_id: String,
    pub image_id: String,
    /// `algorithm_params.case_id`, falling back to the image id
    pub case_id: String,
    pub subject_id: Option<String>,
    pub study: Option<String>,
    pub slide: Option<String>,
    pub analysis_type: String,
    pub computation: String,
    /// RFC 3339 submission timestamp, when recorded
    pub submitted_at: Option<String>,
    pub randval: Option<f64>,
    pub dimensions: ImageDimensions,
    /// Algorithm parameters in document order, image dimensions excluded
    pub parameters: Vec<(String, ParamValue)>,
}

impl AnalysisMetadata {
    pub fn from_document(doc: &Document, fallback: ImageDimensions) -> Result<Self, DatabaseError> {
        let id = doc.get("_id").and_then(text).unwrap_or_default();
        let invalid = |what: &str| DatabaseError::InvalidDocument(format!("analysis {}: {}", id, what));

        let execution_id = text_at(doc, "analysis.execution_id").ok_or_else(|| invalid("missing analysis.execution_id"))?;
        let image_id = text_at(doc, "image.imageid").ok_or_else(|| invalid("missing image.imageid"))?;
        let params = lookup(doc, "analysis.algorithm_params").and_then(Bson::as_document);

        let dimension = |name: &str, default: u32| -> Result<u32, DatabaseError> {
            match params.and_then(|p| p.get(name)) {
                None | Some(Bson::Null) => Ok(default),
                Some(value) => lenient_number(value)
                    .filter(|v| v.is_finite() && *v >= 1.0 && *v <= f64::from(u32::MAX))
                    .map(|v| v as u32)
                    .ok_or_else(|| invalid(&format!("invalid {}: {}", name, value))),
            }
        };
        let dimensions =
            ImageDimensions { width: dimension("image_width", fallback.width)?, height: dimension("image_height", fallback.height)? };

        let case_id = params.and_then(|p| p.get("case_id")).and_then(text).filter(|s| !s.is_empty()).unwrap_or_else(|| image_id.clone());

        let submitted_at = lookup(doc, "analysis.submit_date").and_then(|value| match value {
            Bson::DateTime(dt) => Some(dt.to_chrono().to_rfc3339_opts(SecondsFormat::Millis, true)),
            Bson::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        });

        let parameters = params
            .map(|p| {
                p.iter()
                    .filter(|(key, _)| key.as_str() != "image_width" && key.as_str() != "image_height")
                    .filter_map(|(key, value)| param_value(value).map(|v| (key.clone(), v)))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            execution_id,
            case_id,
            subject_id: text_at(doc, "image.subject"),
            study: text_at(doc, "image.study"),
            slide: text_at(doc, "image.slide"),
            analysis_type: text_at(doc, "analysis.type").unwrap_or_else(|| "computer".to_string()),
            computation: text_at(doc, "analysis.computation").unwrap_or_else(|| "segmentation".to_string()),
            submitted_at,
            randval: lookup(doc, "analysis.randval").and_then(number),
            dimensions,
            parameters,
            image_id,
            id,
        })
    }
}

fn param_value(value: &Bson) -> Option<ParamValue> {
    match value {
        Bson::Null => None,
        Bson::String(s) if s.is_empty() => None,
        Bson::String(s) => Some(ParamValue::Text(s.clone())),
        Bson::Boolean(b) => Some(ParamValue::Bool(*b)),
        Bson::Int32(v) => Some(ParamValue::Int(i64::from(*v))),
        Bson::Int64(v) => Some(ParamValue::Int(*v)),
        Bson::Double(v) => Some(ParamValue::Float(*v)),
        other => Some(ParamValue::Text(other.to_string())),
    }
}
