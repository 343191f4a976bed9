//! Terms used by the document builders.

macro_rules! vocabulary {
    ($(#[$doc:meta])* $module:ident = $namespace:literal { $($name:ident => $local:literal),* $(,)? }) => {
        $(#[$doc])*
        pub mod $module {
            use oxrdf::NamedNodeRef;

            pub const NAMESPACE: &str = $namespace;
            $(pub const $name: NamedNodeRef<'static> = NamedNodeRef::new_unchecked(concat!($namespace, $local));)*
        }
    };
}

vocabulary!(dcterms = "http://purl.org/dc/terms/" {
    IDENTIFIER => "identifier",
    CREATED => "created",
    TYPE => "type",
    TITLE => "title",
    DESCRIPTION => "description",
    IS_PART_OF => "isPartOf",
});

vocabulary!(exif = "http://www.w3.org/2003/12/exif/ns#" {
    HEIGHT => "height",
    WIDTH => "width",
});

vocabulary!(geo = "http://www.opengis.net/ont/geosparql#" {
    FEATURE_COLLECTION => "FeatureCollection",
    FEATURE => "Feature",
    GEOMETRY => "Geometry",
    HAS_GEOMETRY => "hasGeometry",
    AS_WKT => "asWKT",
    WKT_LITERAL => "wktLiteral",
    HAS_MEMBER => "hasMember",
    HAS_FEATURE => "hasFeature",
});

vocabulary!(hal = "https://halcyon.is/ns/" {
    CASE_ID => "caseId",
    EXECUTION_ID => "executionId",
    STUDY => "study",
    ANALYSIS_RANDVAL => "analysisRandval",
    SUBJECT_ID => "subjectId",
    CLASSIFICATION => "classification",
    AREA_IN_PIXELS => "areaInPixels",
    PHYSICAL_SIZE => "physicalSize",
    RANDVAL => "randval",
    BATCH_ID => "batchId",
    TAG_ID => "tagId",
    MEASUREMENT => "measurement",
    HAS_PROBABILITY => "hasProbability",
});

vocabulary!(prov = "http://www.w3.org/ns/prov#" {
    ENTITY => "Entity",
    ACTIVITY => "Activity",
    WAS_GENERATED_BY => "wasGeneratedBy",
    WAS_DERIVED_FROM => "wasDerivedFrom",
    GENERATED_AT_TIME => "generatedAtTime",
    USED => "used",
    STARTED_AT_TIME => "startedAtTime",
});

vocabulary!(rdfs = "http://www.w3.org/2000/01/rdf-schema#" {
    MEMBER => "member",
});

vocabulary!(so = "https://schema.org/" {
    IMAGE_OBJECT => "ImageObject",
});

vocabulary!(snomed = "http://snomed.info/id/" {
    NUCLEAR_MATERIAL => "68841002",
});

vocabulary!(
    /// Legacy caMicroscope schema
    camic = "http://example.org/camic#" {
        PATHOLOGY_IMAGE => "PathologyImage",
        IMAGE_ID => "imageId",
        CASE_ID => "caseId",
        SUBJECT_ID => "subjectId",
        STUDY_ID => "studyId",
        SLIDE_ID => "slideId",
        IMAGE_WIDTH => "imageWidth",
        IMAGE_HEIGHT => "imageHeight",
        ANALYSIS_ID => "analysisId",
        HAS_FEATURE_COLLECTION => "hasFeatureCollection",
        MARK_ID => "markId",
        EXECUTION_ID => "executionId",
        NUCLEUS_TYPE => "nucleusType",
        HAS_MATERIAL_TYPE => "hasMaterialType",
        HAS_ANNOTATION => "hasAnnotation",
        FOOTPRINT => "footprint",
    }
);

vocabulary!(
    /// caMicroscope API namespace used for unlinked marks
    camic_api = "https://grlc.io/api/MathurMihir/camic-apis/" {
        CLASSIFICATION => "classification",
    }
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terms_are_namespace_plus_local_name() {
        assert_eq!(geo::AS_WKT.as_str(), "http://www.opengis.net/ont/geosparql#asWKT");
        assert_eq!(snomed::NUCLEAR_MATERIAL.as_str(), "http://snomed.info/id/68841002");
        assert!(camic_api::CLASSIFICATION.as_str().starts_with(camic_api::NAMESPACE));
    }
}
