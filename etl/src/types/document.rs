//! Small helpers for reading loosely-typed BSON documents.

use mongodb::bson::{Bson, Document};

/// Follow a dotted path (`provenance.analysis.execution_id`) through nested documents.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }
    Some(current)
}

/// Textual form of a scalar value. Strings are returned as-is, ObjectIds as hex.
pub fn text(value: &Bson) -> Option<String> {
    match value {
        Bson::String(s) => Some(s.clone()),
        Bson::ObjectId(oid) => Some(oid.to_hex()),
        Bson::Int32(v) => Some(v.to_string()),
        Bson::Int64(v) => Some(v.to_string()),
        Bson::Double(v) => Some(v.to_string()),
        Bson::Boolean(v) => Some(v.to_string()),
        _ => None,
    }
}

/// Non-empty textual value at a dotted path.
pub fn text_at(doc: &Document, path: &str) -> Option<String> {
    lookup(doc, path).and_then(text).filter(|s| !s.is_empty())
}

/// Numeric value, accepting every BSON number representation.
pub fn number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Double(v) => Some(*v),
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        _ => None,
    }
}

/// Numeric value that may also be stored as a decimal string.
pub fn lenient_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::String(s) => s.trim().parse().ok(),
        other => number(other),
    }
}
