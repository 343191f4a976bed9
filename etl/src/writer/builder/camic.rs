use oxrdf::vocab::xsd;
use oxrdf::{BlankNode, Literal, NamedNode};

use super::{BatchContext, DocumentBuilder};
use crate::types::{AnalysisMetadata, FeatureMember};
use crate::writer::turtle::{image_hash, iri, typed, TurtleDocument};
use crate::writer::vocab::{camic, geo, prov, snomed};
use crate::writer::WriterError;

const PREFIXES: &[(&str, &str)] = &[
    ("geo", geo::NAMESPACE),
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("snomed", snomed::NAMESPACE),
    ("prov", prov::NAMESPACE),
    ("camic", camic::NAMESPACE),
];

/// Legacy caMicroscope layout. The image carries its bounds as a geometry and one
/// feature collection holding the members.
#[derive(Debug, Clone, Copy, Default)]
pub struct CamicBuilder;

impl DocumentBuilder for CamicBuilder {
    fn name(&self) -> &'static str {
        "camic"
    }

    fn requires_analysis(&self) -> bool {
        true
    }

    fn render(&self, context: &BatchContext<'_>, members: &[FeatureMember]) -> Result<TurtleDocument, WriterError> {
        let analysis = context.require_analysis(self.name())?;
        let image = iri(format!("{}image_{}", camic::NAMESPACE, image_hash(&analysis.image_id)))?;
        let collection = context.collection_iri()?;

        let mut document = TurtleDocument::new(PREFIXES);
        document
            .comment(format!("Analysis: {}", analysis.id))
            .comment(format!("Execution: {}", analysis.execution_id))
            .comment(format!("Image: {}", analysis.image_id))
            .comment(format!("Batch: {:06}", context.batch_number));

        add_image(&mut document, &image, analysis);
        document
            .add(image, camic::HAS_FEATURE_COLLECTION, collection.clone())
            .types(collection.clone(), &[geo::FEATURE_COLLECTION])
            .add(collection.clone(), prov::GENERATED_AT_TIME, typed(context.generated_at_text(), xsd::DATE_TIME));

        for member in members {
            let node = BlankNode::default();
            document.add(collection.clone(), geo::HAS_MEMBER, node.clone());
            add_member(&mut document, node, member);
        }
        Ok(document)
    }
}

fn text(value: &str) -> Literal {
    Literal::new_simple_literal(value)
}

fn add_image(document: &mut TurtleDocument, image: &NamedNode, analysis: &AnalysisMetadata) {
    let (width, height) = (analysis.dimensions.width, analysis.dimensions.height);
    let bounds = format!("POLYGON ((0 0, {w} 0, {w} {h}, 0 {h}, 0 0))", w = width, h = height);
    let geometry = BlankNode::default();

    document
        .types(image.clone(), &[camic::PATHOLOGY_IMAGE])
        .add(image.clone(), camic::IMAGE_ID, text(&analysis.image_id))
        .add(image.clone(), camic::CASE_ID, text(&analysis.case_id))
        .add_opt(image.clone(), camic::SUBJECT_ID, analysis.subject_id.as_deref().map(text))
        .add_opt(image.clone(), camic::STUDY_ID, analysis.study.as_deref().map(text))
        .add_opt(image.clone(), camic::SLIDE_ID, analysis.slide.as_deref().map(text))
        .add(image.clone(), camic::IMAGE_WIDTH, typed(width, xsd::INTEGER))
        .add(image.clone(), camic::IMAGE_HEIGHT, typed(height, xsd::INTEGER))
        .add(image.clone(), camic::ANALYSIS_ID, text(&analysis.id))
        .add(image.clone(), geo::HAS_GEOMETRY, geometry.clone())
        .add(geometry, geo::AS_WKT, typed(bounds, geo::WKT_LITERAL));
}

fn add_member(document: &mut TurtleDocument, node: BlankNode, member: &FeatureMember) {
    let geometry = BlankNode::default();
    // annotation ids come straight from user input; drop the ones that are not IRIs
    let annotation = member.annotation_iri.as_deref().and_then(|value| NamedNode::new(value).ok());

    document
        .types(node.clone(), &[geo::FEATURE])
        .add_opt(node.clone(), camic::MARK_ID, member.mark_id.as_deref().map(text))
        .add(node.clone(), camic::EXECUTION_ID, text(member.execution_id.as_deref().unwrap_or("unknown")))
        .add_opt(node.clone(), camic::NUCLEUS_TYPE, member.nucleus_type.as_deref().map(text))
        .add_opt(
            node.clone(),
            camic::HAS_MATERIAL_TYPE,
            member.is_nuclear_material().then(|| snomed::NUCLEAR_MATERIAL.into_owned()),
        )
        .add_opt(node.clone(), camic::HAS_ANNOTATION, annotation)
        .add(node.clone(), camic::FOOTPRINT, typed(member.footprint.unwrap_or(0.0), xsd::DOUBLE))
        .add(node, geo::HAS_GEOMETRY, geometry.clone())
        .add(geometry, geo::AS_WKT, typed(&member.wkt, geo::WKT_LITERAL));
}
