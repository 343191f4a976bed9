//! Batch documents as `oxrdf` triples, serialized with `oxttl`.

use std::io::Write;

use oxrdf::vocab::rdf;
use oxrdf::{Literal, NamedNode, NamedNodeRef, Subject, Term, Triple};
use oxttl::TurtleSerializer;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use sha2::{Digest, Sha256};

use super::WriterError;

/// Characters escaped when a data value becomes part of an IRI. `%` is included so the
/// encoding stays reversible.
const IRI_COMPONENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'%')
    .add(b'/')
    .add(b'#')
    .add(b'?');

/// Percent-encode a data value for use as one IRI segment.
pub fn iri_component(value: &str) -> String {
    utf8_percent_encode(value, IRI_COMPONENT).to_string()
}

/// Parse `value` as an absolute IRI.
pub fn iri(value: impl Into<String>) -> Result<NamedNode, WriterError> {
    Ok(NamedNode::new(value)?)
}

pub fn typed(value: impl ToString, datatype: NamedNodeRef<'_>) -> Literal {
    Literal::new_typed_literal(value.to_string(), datatype)
}

/// Local name for a parameter predicate: underscores dropped, anything else outside
/// `[A-Za-z0-9]` removed. Returns `None` when nothing usable remains.
pub fn local_name(key: &str) -> Option<String> {
    let name: String = key.chars().filter(char::is_ascii_alphanumeric).collect();
    match name.chars().next() {
        None => None,
        Some(first) if first.is_ascii_digit() => Some(format!("p{}", name)),
        Some(_) => Some(name),
    }
}

/// Hex SHA-256 of an image identifier, used for `urn:sha256:` image IRIs.
pub fn image_hash(image_id: &str) -> String {
    hex::encode(Sha256::digest(image_id.as_bytes()))
}

/// Triples of one batch file, with the prefixes and leading comments it is written with.
#[derive(Debug, Clone)]
pub struct TurtleDocument {
    prefixes: &'static [(&'static str, &'static str)],
    comments: Vec<String>,
    triples: Vec<Triple>,
}

impl TurtleDocument {
    pub fn new(prefixes: &'static [(&'static str, &'static str)]) -> Self {
        Self { prefixes, comments: Vec::new(), triples: Vec::new() }
    }

    /// Header comment line. Line breaks are folded into spaces.
    pub fn comment(&mut self, line: impl AsRef<str>) -> &mut Self {
        self.comments.push(line.as_ref().replace(['\n', '\r'], " "));
        self
    }

    pub fn add(
        &mut self,
        subject: impl Into<Subject>,
        predicate: impl Into<NamedNode>,
        object: impl Into<Term>,
    ) -> &mut Self {
        self.triples.push(Triple::new(subject, predicate, object));
        self
    }

    pub fn add_opt(
        &mut self,
        subject: impl Into<Subject>,
        predicate: impl Into<NamedNode>,
        object: Option<impl Into<Term>>,
    ) -> &mut Self {
        if let Some(object) = object {
            self.add(subject, predicate, object);
        }
        self
    }

    /// `subject a class` for each class
    pub fn types(&mut self, subject: impl Into<Subject>, classes: &[NamedNodeRef<'static>]) -> &mut Self {
        let subject = subject.into();
        for class in classes {
            self.add(subject.clone(), rdf::TYPE, class.into_owned());
        }
        self
    }

    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    /// Serialize as Turtle. Triples are written in insertion order.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WriterError> {
        let mut buffer = Vec::new();
        for line in &self.comments {
            writeln!(buffer, "# {}", line)?;
        }
        if !self.comments.is_empty() {
            writeln!(buffer)?;
        }

        let mut serializer = TurtleSerializer::new();
        for (prefix, namespace) in self.prefixes {
            serializer = serializer.with_prefix(*prefix, *namespace)?;
        }
        let mut writer = serializer.for_writer(buffer);
        for triple in &self.triples {
            writer.serialize_triple(triple)?;
        }
        Ok(writer.finish()?)
    }
}

#[cfg(test)]
pub(crate) mod parse {
    use oxrdf::{NamedNodeRef, Term, Triple};
    use oxttl::TurtleParser;

    pub fn triples(document: &[u8]) -> Vec<Triple> {
        TurtleParser::new().for_reader(document).collect::<Result<Vec<_>, _>>().unwrap()
    }

    /// Objects of every triple using `predicate`, in document order
    pub fn objects(triples: &[Triple], predicate: NamedNodeRef<'_>) -> Vec<Term> {
        triples.iter().filter(|t| t.predicate.as_ref() == predicate).map(|t| t.object.clone()).collect()
    }

    /// Lexical values of the literal objects of `predicate`
    pub fn values(triples: &[Triple], predicate: NamedNodeRef<'_>) -> Vec<String> {
        objects(triples, predicate)
            .into_iter()
            .filter_map(|term| match term {
                Term::Literal(literal) => Some(literal.value().to_string()),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::vocab::geo;
    use oxrdf::vocab::xsd;
    use oxrdf::BlankNode;
    use rstest::rstest;

    const PREFIXES: &[(&str, &str)] = &[("geo", geo::NAMESPACE)];

    #[rstest]
    #[case("seg-v1", "seg-v1")]
    #[case("seg v1", "seg%20v1")]
    #[case("a<b>|c", "a%3Cb%3E%7Cc")]
    #[case("50%/x", "50%25%2Fx")]
    fn iri_components(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(iri_component(input), expected);
    }

    #[test]
    fn relative_or_broken_iris_are_rejected() {
        assert_matches::assert_matches!(iri("no scheme here"), Err(WriterError::Iri(_)));
        assert!(iri(format!("urn:analysis:{}", iri_component("seg v1"))).is_ok());
    }

    #[rstest]
    #[case("min_size", Some("minsize"))]
    #[case("3d_mode", Some("p3dmode"))]
    #[case("__", None)]
    fn parameter_local_names(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(local_name(input).as_deref(), expected);
    }

    #[test]
    fn image_hash_is_hex_sha256() {
        assert_eq!(image_hash(""), "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855");
    }

    #[test]
    fn document_round_trips_through_a_turtle_parser() {
        let feature = iri("urn:feature:1").unwrap();
        let geometry = BlankNode::default();
        let mut document = TurtleDocument::new(PREFIXES);
        document
            .comment("Batch: 1\nsecond line")
            .types(feature.clone(), &[geo::FEATURE])
            .add(feature.clone(), geo::HAS_GEOMETRY, geometry.clone())
            .add(geometry, geo::AS_WKT, typed("say \"hi\"\n", geo::WKT_LITERAL))
            .add_opt(feature, geo::HAS_MEMBER, None::<Literal>);

        let bytes = document.to_bytes().unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with("# Batch: 1 second line\n\n"));
        assert!(text.contains("@prefix geo: <http://www.opengis.net/ont/geosparql#>"));

        let triples = parse::triples(&bytes);
        assert_eq!(triples.len(), 3);
        assert_eq!(parse::values(&triples, geo::AS_WKT), vec!["say \"hi\"\n"]);
        assert!(parse::objects(&triples, geo::HAS_MEMBER).is_empty());
    }

    #[test]
    fn typed_literals_keep_their_datatype() {
        let literal = typed(42, xsd::INT);
        assert_eq!(literal.value(), "42");
        assert_eq!(literal.datatype(), xsd::INT);
    }
}
