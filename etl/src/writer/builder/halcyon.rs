use oxrdf::vocab::xsd;
use oxrdf::{BlankNode, Literal, NamedNode};

use super::{BatchContext, DocumentBuilder};
use crate::types::{AnalysisMetadata, FeatureMember, ParamValue};
use crate::writer::turtle::{image_hash, iri, iri_component, local_name, typed, TurtleDocument};
use crate::writer::vocab::{dcterms, exif, geo, hal, prov, rdfs, snomed, so};
use crate::writer::WriterError;

const PREFIXES: &[(&str, &str)] = &[
    ("dcterms", dcterms::NAMESPACE),
    ("exif", exif::NAMESPACE),
    ("geo", geo::NAMESPACE),
    ("hal", hal::NAMESPACE),
    ("prov", prov::NAMESPACE),
    ("rdfs", rdfs::NAMESPACE),
    ("sno", snomed::NAMESPACE),
    ("so", so::NAMESPACE),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
];

/// Halcyon layout: image entity, analysis activity with its parameters, and a feature
/// collection whose members are blank nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct HalcyonBuilder;

impl DocumentBuilder for HalcyonBuilder {
    fn name(&self) -> &'static str {
        "halcyon"
    }

    fn requires_analysis(&self) -> bool {
        true
    }

    fn render(&self, context: &BatchContext<'_>, members: &[FeatureMember]) -> Result<TurtleDocument, WriterError> {
        let analysis = context.require_analysis(self.name())?;
        let image = iri(format!("urn:sha256:{}", image_hash(&analysis.image_id)))?;
        let activity = activity_iri(&analysis.execution_id)?;
        let collection = context.collection_iri()?;
        let generated_at = context.generated_at_text();

        let mut document = TurtleDocument::new(PREFIXES);
        add_image(&mut document, &image, analysis);
        add_activity(&mut document, &activity, &image, analysis)?;

        document
            .types(collection.clone(), &[geo::FEATURE_COLLECTION, prov::ENTITY])
            .add(collection.clone(), dcterms::IDENTIFIER, text(&analysis.id))
            .add(
                collection.clone(),
                dcterms::CREATED,
                typed(analysis.submitted_at.as_deref().unwrap_or(&generated_at), xsd::DATE_TIME),
            )
            .add(collection.clone(), dcterms::TYPE, text(&format!("{}/{}", analysis.analysis_type, analysis.computation)))
            .add(collection.clone(), dcterms::TITLE, text(&title(analysis, context.batch_number)))
            .add(collection.clone(), dcterms::DESCRIPTION, text(&description(analysis, context.batch_number)))
            .add(collection.clone(), hal::CASE_ID, text(&analysis.case_id))
            .add(collection.clone(), hal::EXECUTION_ID, text(&analysis.execution_id))
            .add_opt(collection.clone(), hal::STUDY, analysis.study.as_deref().map(text))
            .add_opt(
                collection.clone(),
                hal::ANALYSIS_RANDVAL,
                analysis.randval.map(|v| typed(format!("{:.10}", v), xsd::FLOAT)),
            )
            .add(collection.clone(), prov::WAS_GENERATED_BY, activity)
            .add(collection.clone(), prov::WAS_DERIVED_FROM, image)
            .add(collection.clone(), prov::GENERATED_AT_TIME, typed(&generated_at, xsd::DATE_TIME));

        for member in members {
            let node = BlankNode::default();
            document.add(collection.clone(), rdfs::MEMBER, node.clone());
            add_member(&mut document, node, member)?;
        }
        Ok(document)
    }
}

fn text(value: &str) -> Literal {
    Literal::new_simple_literal(value)
}

fn activity_iri(execution_id: &str) -> Result<NamedNode, WriterError> {
    iri(format!("urn:analysis:{}", iri_component(execution_id)))
}

fn title(analysis: &AnalysisMetadata, batch_number: u32) -> String {
    format!("{} - {} (Batch {})", analysis.execution_id, analysis.case_id, batch_number)
}

fn description(analysis: &AnalysisMetadata, batch_number: u32) -> String {
    let mut text = format!("Nuclear segmentation results for {}", analysis.case_id);
    if let Some(study) = &analysis.study {
        text.push_str(&format!(" from study {}", study));
    }
    if let Some(subject) = &analysis.subject_id {
        text.push_str(&format!(", subject {}", subject));
    }
    if let Some(slide) = &analysis.slide {
        text.push_str(&format!(", slide {}", slide));
    }
    text.push_str(&format!(" - Batch {}", batch_number));
    text
}

fn add_image(document: &mut TurtleDocument, image: &NamedNode, analysis: &AnalysisMetadata) {
    document
        .types(image.clone(), &[so::IMAGE_OBJECT, prov::ENTITY])
        .add(image.clone(), dcterms::IDENTIFIER, text(&analysis.case_id))
        .add_opt(image.clone(), hal::SUBJECT_ID, analysis.subject_id.as_deref().map(text))
        .add_opt(image.clone(), dcterms::IS_PART_OF, analysis.study.as_deref().map(text))
        .add(image.clone(), exif::HEIGHT, typed(analysis.dimensions.height, xsd::INT))
        .add(image.clone(), exif::WIDTH, typed(analysis.dimensions.width, xsd::INT));
}

fn add_activity(
    document: &mut TurtleDocument,
    activity: &NamedNode,
    image: &NamedNode,
    analysis: &AnalysisMetadata,
) -> Result<(), WriterError> {
    document.types(activity.clone(), &[prov::ACTIVITY]).add(activity.clone(), prov::USED, image.clone());
    for (key, value) in &analysis.parameters {
        let Some(name) = local_name(key) else { continue };
        let object = match value {
            ParamValue::Bool(b) => typed(b, xsd::BOOLEAN),
            ParamValue::Int(i) => typed(i, xsd::INT),
            ParamValue::Float(f) => typed(f, xsd::FLOAT),
            ParamValue::Text(s) => text(s),
        };
        document.add(activity.clone(), iri(format!("{}{}", hal::NAMESPACE, name))?, object);
    }
    document.add_opt(
        activity.clone(),
        prov::STARTED_AT_TIME,
        analysis.submitted_at.as_deref().map(|ts| typed(ts, xsd::DATE_TIME)),
    );
    Ok(())
}

fn add_member(document: &mut TurtleDocument, node: BlankNode, member: &FeatureMember) -> Result<(), WriterError> {
    let geometry = BlankNode::default();
    let measurement = BlankNode::default();
    let generated_by = member.execution_id.as_deref().map(activity_iri).transpose()?;

    document
        .types(node.clone(), &[geo::FEATURE, prov::ENTITY])
        .add(node.clone(), geo::HAS_GEOMETRY, geometry.clone())
        .add(geometry, geo::AS_WKT, typed(&member.wkt, geo::WKT_LITERAL))
        .add(node.clone(), hal::CLASSIFICATION, snomed::NUCLEAR_MATERIAL.into_owned())
        .add_opt(node.clone(), hal::AREA_IN_PIXELS, member.area_in_pixels.map(|v| typed(v, xsd::INT)))
        .add_opt(node.clone(), hal::PHYSICAL_SIZE, member.physical_size.map(|v| typed(format!("{:.6}", v), xsd::FLOAT)))
        .add_opt(node.clone(), dcterms::TYPE, member.object_type.as_deref().map(text))
        .add_opt(node.clone(), hal::RANDVAL, member.randval.map(|v| typed(format!("{:.10}", v), xsd::FLOAT)))
        .add_opt(node.clone(), hal::BATCH_ID, member.batch_id.as_deref().map(text))
        .add_opt(node.clone(), hal::TAG_ID, member.tag_id.as_deref().map(text))
        .add_opt(node.clone(), prov::WAS_GENERATED_BY, generated_by)
        .add(node, hal::MEASUREMENT, measurement.clone())
        .add(measurement, hal::HAS_PROBABILITY, typed("1.0", xsd::FLOAT));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::builder::fixtures;
    use crate::writer::turtle::parse;
    use oxrdf::Term;

    #[test]
    fn renders_header_and_members() {
        let unit = fixtures::unit();
        let analysis = fixtures::analysis();
        let bytes = HalcyonBuilder
            .render(&fixtures::context(&unit, Some(&analysis)), &fixtures::members())
            .unwrap()
            .to_bytes()
            .unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with("@prefix dcterms: <http://purl.org/dc/terms/> .\n"));

        let triples = parse::triples(&bytes);
        let image = format!("urn:sha256:{}", image_hash("TCGA-01"));
        assert!(triples.iter().any(|t| t.subject.to_string() == format!("<{}>", image)));
        assert_eq!(parse::values(&triples, exif::WIDTH), vec!["100"]);
        assert_eq!(parse::values(&triples, exif::HEIGHT), vec!["200"]);

        let minsize = NamedNode::new("https://halcyon.is/ns/minsize").unwrap();
        assert_eq!(parse::values(&triples, minsize.as_ref()), vec!["8"]);
        let note = NamedNode::new("https://halcyon.is/ns/note").unwrap();
        assert_eq!(parse::values(&triples, note.as_ref()), vec!["say \"hi\""]);
        assert_eq!(parse::values(&triples, prov::STARTED_AT_TIME), vec!["2024-01-02T03:04:05.000Z"]);
        assert_eq!(parse::values(&triples, prov::GENERATED_AT_TIME), vec!["2025-05-06T07:08:09.000Z"]);
        assert_eq!(parse::values(&triples, dcterms::TITLE), vec!["seg-v1 - CASE-7 (Batch 2)"]);
        assert_eq!(
            parse::values(&triples, dcterms::DESCRIPTION),
            vec!["Nuclear segmentation results for CASE-7 from study brca, subject SUBJ-3 - Batch 2"]
        );
        assert_eq!(parse::values(&triples, hal::ANALYSIS_RANDVAL), vec!["0.2500000000"]);

        let collection = fixtures::context(&unit, None).collection_iri().unwrap();
        let members: Vec<_> = triples.iter().filter(|t| t.predicate.as_ref() == rdfs::MEMBER).collect();
        assert_eq!(members.len(), 2);
        assert!(members.iter().all(|t| t.subject.to_string() == collection.to_string()));
        assert_eq!(
            parse::values(&triples, geo::AS_WKT),
            vec![
                "POLYGON ((0.00 0.00, 100.00 0.00, 100.00 100.00, 0.00 0.00))",
                "POLYGON ((1.00 1.00, 2.00 1.00, 2.00 2.00, 1.00 1.00))",
            ]
        );
        assert_eq!(parse::values(&triples, hal::AREA_IN_PIXELS), vec!["42"]);
        assert_eq!(parse::values(&triples, hal::PHYSICAL_SIZE), vec!["3.500000"]);
        let classes = parse::objects(&triples, hal::CLASSIFICATION);
        assert_eq!(classes, vec![Term::from(snomed::NUCLEAR_MATERIAL.into_owned()); 2]);
    }

    #[test]
    fn execution_ids_are_escaped_into_activity_iris() {
        assert_eq!(activity_iri("seg v1").unwrap().as_str(), "urn:analysis:seg%20v1");
    }

    #[test]
    fn missing_analysis_is_an_error() {
        let unit = fixtures::unit();
        assert!(HalcyonBuilder.render(&fixtures::context(&unit, None), &fixtures::members()).is_err());
    }
}
