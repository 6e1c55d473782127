//! RDF glue: the de-duplicated triple collection handed to the pipeline,
//! Turtle parsing through oxigraph, and batch serialization.

use std::collections::HashSet;
use std::fmt::Write;

use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::{NamedNode, Triple};

use crate::error::RdfError;

/// Well-known IRIs used by the analysis queries.
pub mod vocab {
    pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
    pub const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
    pub const DC_TITLE: &str = "http://purl.org/dc/elements/1.1/title";
    pub const FOAF_NAME: &str = "http://xmlns.com/foaf/0.1/name";
    pub const SKOS_PREF_LABEL: &str = "http://www.w3.org/2004/02/skos/core#prefLabel";

    /// Label-like predicates in lookup priority order, paired with the
    /// variable name used for them in instance queries.
    pub const LABEL_PREDICATES: [(&str, &str); 4] = [
        ("label", RDFS_LABEL),
        ("title", DC_TITLE),
        ("name", FOAF_NAME),
        ("prefLabel", SKOS_PREF_LABEL),
    ];
}

/// Insertion-ordered set of triples.
///
/// Duplicates are dropped on insert, so `len()` is the number of distinct
/// statements, and iteration follows first-insertion order.
#[derive(Debug, Clone, Default)]
pub struct TripleSet {
    triples: Vec<Triple>,
    seen: HashSet<Triple>,
}

impl TripleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a triple. Returns false if it was already present.
    pub fn insert(&mut self, triple: Triple) -> bool {
        if self.seen.contains(&triple) {
            return false;
        }
        self.seen.insert(triple.clone());
        self.triples.push(triple);
        true
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Triple> {
        self.triples.iter()
    }

    pub fn as_slice(&self) -> &[Triple] {
        &self.triples
    }
}

impl FromIterator<Triple> for TripleSet {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        let mut set = TripleSet::new();
        for triple in iter {
            set.insert(triple);
        }
        set
    }
}

impl<'a> IntoIterator for &'a TripleSet {
    type Item = &'a Triple;
    type IntoIter = std::slice::Iter<'a, Triple>;

    fn into_iter(self) -> Self::IntoIter {
        self.triples.iter()
    }
}

/// Parses a Turtle document into a [`TripleSet`].
///
/// Quads in named graphs are flattened; only the triple part is kept.
pub fn parse_turtle(data: &str, base_iri: Option<&str>) -> Result<TripleSet, RdfError> {
    let mut parser = RdfParser::from_format(RdfFormat::Turtle);
    if let Some(base) = base_iri {
        parser = parser
            .with_base_iri(base)
            .map_err(|e| RdfError::InvalidIri {
                iri: base.to_string(),
                reason: e.to_string(),
            })?;
    }

    let mut set = TripleSet::new();
    for quad in parser.for_reader(data.as_bytes()) {
        let quad = quad.map_err(|e| RdfError::Parse(e.to_string()))?;
        set.insert(quad.into());
    }
    Ok(set)
}

/// Serializes triples as N-Triples lines, which any Turtle endpoint accepts.
pub fn serialize_triples(triples: &[Triple]) -> String {
    let mut out = String::with_capacity(triples.len() * 96);
    for triple in triples {
        // Writing to a String cannot fail.
        let _ = writeln!(out, "{triple} .");
    }
    out
}

/// Checks that `iri` is an absolute IRI safe to splice into `<...>`.
pub fn validate_iri(iri: &str) -> Result<NamedNode, RdfError> {
    NamedNode::new(iri).map_err(|e| RdfError::InvalidIri {
        iri: iri.to_string(),
        reason: e.to_string(),
    })
}

/// Last path or fragment segment of a URI, or the URI itself when that
/// segment is empty.
pub fn local_name(uri: &str) -> &str {
    let trimmed = uri.trim_end_matches(['/', '#']);
    match trimmed.rfind(['/', '#']) {
        Some(pos) if pos + 1 < trimmed.len() => &trimmed[pos + 1..],
        _ => uri,
    }
}

/// Escapes a value for use inside a double-quoted SPARQL string literal.
pub fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}
