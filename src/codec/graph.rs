use std::collections::HashSet;

use oxigraph::io::{RdfFormat, RdfParser, RdfSerializer};
use oxigraph::model::{GraphName, Quad, Term as RdfTerm, Triple};

use crate::error::CodecError;

/// The triples of a canonical graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripleContainer {
    pub elements: HashSet<Triple>,
}

impl TripleContainer {
    pub fn new(elements: HashSet<Triple>) -> Self {
        Self { elements }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn add(&mut self, triple: Triple) {
        self.elements.insert(triple);
    }

    pub fn extend(&mut self, other: TripleContainer) {
        self.elements.extend(other.elements);
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.elements.contains(triple)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.elements.iter()
    }

    /// The triples as quads of the default graph, for loading into a store.
    pub fn quads(&self) -> impl Iterator<Item = Quad> + '_ {
        self.elements
            .iter()
            .map(|t| t.clone().in_graph(GraphName::DefaultGraph))
    }

    /// Objects of `subject predicate ?o`. Subjects are addressed by their
    /// N-Triples form (`<iri>` or `_:id`).
    pub fn objects<'a>(&'a self, subject: &str, predicate: &str) -> impl Iterator<Item = &'a RdfTerm> {
        self.elements
            .iter()
            .filter(move |t| t.predicate.as_str() == predicate && t.subject.to_string() == subject)
            .map(|t| &t.object)
    }

    pub fn object(&self, subject: &str, predicate: &str) -> Option<&RdfTerm> {
        let mut objects: Vec<&RdfTerm> = self.objects(subject, predicate).collect();
        objects.sort_by_key(|o| o.to_string());
        objects.into_iter().next()
    }

    /// Subjects of `?s predicate object`, sorted.
    pub fn subjects(&self, predicate: &str, object: &str) -> Vec<String> {
        let mut subjects: Vec<String> = self
            .elements
            .iter()
            .filter(|t| t.predicate.as_str() == predicate && t.object.to_string() == object)
            .map(|t| t.subject.to_string())
            .collect();
        subjects.sort();
        subjects.dedup();
        subjects
    }

    pub fn has_type(&self, subject: &str, type_iri: &str) -> bool {
        self.objects(subject, crate::vocabulary::rdf::TYPE)
            .any(|o| matches!(o, RdfTerm::NamedNode(n) if n.as_str() == type_iri))
    }

    /// Sorted N-Triples serialization.
    pub fn to_ntriples(&self) -> Result<String, CodecError> {
        let mut triples: Vec<&Triple> = self.elements.iter().collect();
        triples.sort_by_cached_key(|t| t.to_string());
        let mut serializer = RdfSerializer::from_format(RdfFormat::NTriples).for_writer(Vec::new());
        for triple in triples {
            serializer
                .serialize_triple(triple)
                .map_err(|e| CodecError::NTriples(e.to_string()))?;
        }
        let bytes = serializer
            .finish()
            .map_err(|e| CodecError::NTriples(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| CodecError::NTriples(e.to_string()))
    }

    /// Reads an N-Triples document.
    pub fn from_ntriples(text: &str) -> Result<Self, CodecError> {
        let mut container = TripleContainer::default();
        for quad in RdfParser::from_format(RdfFormat::NTriples).for_reader(text.as_bytes()) {
            let quad = quad.map_err(|e| CodecError::NTriples(e.to_string()))?;
            container.add(Triple::new(quad.subject, quad.predicate, quad.object));
        }
        Ok(container)
    }
}
