use mongodb::bson::{Bson, Document};

use super::analysis::ImageDimensions;
use super::document::{lookup, number, text, text_at};
use crate::geometry::polygon_to_wkt;
use crate::writer::vocab::snomed;

/// A mark that survived geometry conversion, reduced to what the document builders emit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureMember {
    pub mark_id: Option<String>,
    pub wkt: String,
    pub area_in_pixels: Option<i64>,
    pub physical_size: Option<f64>,
    pub object_type: Option<String>,
    pub randval: Option<f64>,
    pub batch_id: Option<String>,
    pub tag_id: Option<String>,
    /// `provenance.analysis.execution_id` of the mark itself
    pub execution_id: Option<String>,
    pub classification: Option<String>,
    pub nucleus_type: Option<String>,
    pub footprint: Option<f64>,
    /// First human annotation, kept only when it is a SNOMED IRI
    pub annotation_iri: Option<String>,
}

impl FeatureMember {
    /// Returns `None` when the mark carries no convertible polygon.
    ///
    /// The polygon is read from `geometries.features[0].geometry`, then from `geometry`.
    pub fn from_mark(mark: &Document, dimensions: ImageDimensions) -> Option<Self> {
        let feature = lookup(mark, "geometries.features")
            .and_then(Bson::as_array)
            .and_then(|features| features.first())
            .and_then(Bson::as_document);
        let geometry = feature
            .and_then(|f| f.get_document("geometry").ok())
            .or_else(|| mark.get_document("geometry").ok())?;
        let wkt = polygon_to_wkt(geometry, dimensions.width, dimensions.height)?;

        let feature_props = feature.and_then(|f| f.get_document("properties").ok());
        let annotations = lookup(mark, "properties.annotations").and_then(Bson::as_document);
        // zero counts as absent
        let measurement = |name: &str| {
            annotations
                .and_then(|a| a.get(name))
                .and_then(number)
                .filter(|v| *v != 0.0)
                .or_else(|| feature_props.and_then(|p| p.get(name)).and_then(number).filter(|v| *v != 0.0))
        };

        Some(Self {
            mark_id: mark.get("_id").and_then(text),
            wkt,
            area_in_pixels: measurement("AreaInPixels").map(|v| v as i64),
            physical_size: measurement("PhysicalSize"),
            object_type: text_at(mark, "object_type"),
            randval: mark.get("randval").and_then(number),
            batch_id: text_at(mark, "provenance.batch_id"),
            tag_id: text_at(mark, "provenance.tag_id"),
            execution_id: text_at(mark, "provenance.analysis.execution_id"),
            classification: text_at(mark, "properties.classification"),
            nucleus_type: feature_props.and_then(|p| p.get("nucleustype")).and_then(text).filter(|s| !s.is_empty()),
            footprint: feature_props.and_then(|p| p.get("footprint")).and_then(number),
            annotation_iri: lookup(mark, "userUpdate.mark.annotation")
                .and_then(Bson::as_array)
                .and_then(|a| a.first())
                .and_then(Bson::as_document)
                .and_then(|a| a.get_str("annotationID").ok())
                .filter(|iri| iri.starts_with(snomed::NAMESPACE))
                .map(str::to_string),
        })
    }

    /// Nucleus types shaped like `tumor.ep.1` denote nuclear material.
    pub fn is_nuclear_material(&self) -> bool {
        self.nucleus_type.as_deref().is_some_and(|t| t.split('.').count() >= 3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    const DIMS: ImageDimensions = ImageDimensions { width: 100, height: 100 };

    #[test]
    fn reads_feature_geometry_and_properties() {
        let mark = doc! {
            "_id": "m-1",
            "object_type": "nucleus",
            "randval": 0.5,
            "geometries": { "features": [{
                "geometry": { "type": "Polygon", "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]] },
                "properties": { "AreaInPixels": 42.9, "nucleustype": "tumor.ep.1", "footprint": 12 },
            }]},
            "properties": { "annotations": { "PhysicalSize": 3.5, "AreaInPixels": 0 } },
            "provenance": { "analysis": { "execution_id": "seg-v1" }, "batch_id": "b7" },
        };
        let member = FeatureMember::from_mark(&mark, DIMS).unwrap();
        assert_eq!(member.wkt, "POLYGON ((0.00 0.00, 100.00 0.00, 100.00 100.00, 0.00 0.00))");
        assert_eq!(member.area_in_pixels, Some(42));
        assert_eq!(member.physical_size, Some(3.5));
        assert_eq!(member.execution_id.as_deref(), Some("seg-v1"));
        assert_eq!(member.batch_id.as_deref(), Some("b7"));
        assert_eq!(member.tag_id, None);
        assert!(member.is_nuclear_material());
    }

    #[test]
    fn falls_back_to_top_level_geometry() {
        let mark = doc! {
            "_id": "m-2",
            "geometry": { "type": "Polygon", "coordinates": [[[0.5, 0.5], [1, 0.5], [1, 1], [0.5, 0.5]]] },
            "properties": { "classification": "lymphocyte" },
        };
        let member = FeatureMember::from_mark(&mark, DIMS).unwrap();
        assert_eq!(member.wkt, "POLYGON ((50.00 50.00, 100.00 50.00, 100.00 100.00, 50.00 50.00))");
        assert_eq!(member.classification.as_deref(), Some("lymphocyte"));
    }

    #[test]
    fn point_geometry_is_skipped() {
        let mark = doc! { "geometries": { "features": [{ "geometry": { "type": "Point", "coordinates": [0.1, 0.2] } }] } };
        assert!(FeatureMember::from_mark(&mark, DIMS).is_none());
    }

    #[test]
    fn keeps_only_snomed_annotations() {
        let base = doc! { "geometry": { "type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1]]] } };
        let mut annotated = base.clone();
        annotated.insert("userUpdate", doc! { "mark": { "annotation": [{ "annotationID": "http://snomed.info/id/1234" }] } });
        let mut other = base;
        other.insert("userUpdate", doc! { "mark": { "annotation": [{ "annotationID": "urn:local:1" }] } });

        assert_eq!(
            FeatureMember::from_mark(&annotated, DIMS).unwrap().annotation_iri.as_deref(),
            Some("http://snomed.info/id/1234")
        );
        assert_eq!(FeatureMember::from_mark(&other, DIMS).unwrap().annotation_iri, None);
    }
}
