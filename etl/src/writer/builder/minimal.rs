use oxrdf::vocab::xsd;
use oxrdf::{BlankNode, Literal, NamedNode, Subject};

use super::{BatchContext, DocumentBuilder};
use crate::types::constant::BATCH_FILE_PREFIX;
use crate::types::FeatureMember;
use crate::writer::turtle::{iri, iri_component, typed, TurtleDocument};
use crate::writer::vocab::{camic_api, geo, prov};
use crate::writer::WriterError;

const PREFIXES: &[(&str, &str)] = &[
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("geo", geo::NAMESPACE),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("prov", prov::NAMESPACE),
    ("camic", camic_api::NAMESPACE),
];

/// Feature collection without analysis context. Each mark becomes its own subject,
/// referenced from the collection through `geo:hasFeature`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinimalBuilder;

impl DocumentBuilder for MinimalBuilder {
    fn name(&self) -> &'static str {
        "minimal"
    }

    fn requires_analysis(&self) -> bool {
        false
    }

    fn render(&self, context: &BatchContext<'_>, members: &[FeatureMember]) -> Result<TurtleDocument, WriterError> {
        let generated_at = context.generated_at_text();
        let collection = collection_iri(context)?;

        let mut document = TurtleDocument::new(PREFIXES);
        document
            .comment(format!("Marks of unit {}", context.unit.key()))
            .comment(format!("Generated: {}", generated_at))
            .comment(format!("Batch: {}", context.batch_number))
            .types(collection.clone(), &[geo::FEATURE_COLLECTION])
            .add(collection.clone(), prov::GENERATED_AT_TIME, typed(&generated_at, xsd::DATE_TIME));

        let subjects = members.iter().map(mark_subject).collect::<Result<Vec<_>, _>>()?;
        for subject in &subjects {
            document.add(collection.clone(), geo::HAS_FEATURE, subject.clone());
        }

        for (member, subject) in members.iter().zip(subjects) {
            let geometry = BlankNode::default();
            document
                .types(subject.clone(), &[geo::FEATURE])
                .add(subject.clone(), geo::HAS_GEOMETRY, geometry.clone())
                .types(geometry.clone(), &[geo::GEOMETRY])
                .add(geometry, geo::AS_WKT, typed(&member.wkt, geo::WKT_LITERAL))
                .add_opt(
                    subject,
                    camic_api::CLASSIFICATION,
                    member.classification.as_deref().map(Literal::new_simple_literal),
                );
        }
        Ok(document)
    }
}

/// `<api>/<segments>/batch_NNNNNN` under the caMicroscope API namespace.
fn collection_iri(context: &BatchContext<'_>) -> Result<NamedNode, WriterError> {
    let scope: Vec<String> = context.unit.output_segments().iter().map(|s| iri_component(s)).collect();
    iri(format!("{}{}/{}{:06}", camic_api::NAMESPACE, scope.join("/"), BATCH_FILE_PREFIX, context.batch_number))
}

/// Mark IRI, or a fresh blank node for marks without an id.
fn mark_subject(member: &FeatureMember) -> Result<Subject, WriterError> {
    Ok(match &member.mark_id {
        Some(id) => iri(format!("{}mark/{}", camic_api::NAMESPACE, iri_component(id)))?.into(),
        None => BlankNode::default().into(),
    })
}
