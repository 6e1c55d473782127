//! SPARQL JSON results and the typed rows the analysis queries produce.
//!
//! The store returns heterogeneous binding maps. Each query kind gets its own
//! row type so callers never poke at variable names directly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AnalysisError;
use crate::rdf::vocab::LABEL_PREDICATES;
use crate::sanitize::truncate_body;

/// One bound RDF term as encoded in `application/sparql-results+json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RdfValue {
    /// `uri`, `literal`, `typed-literal` or `bnode`.
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    #[serde(rename = "xml:lang", default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl RdfValue {
    pub fn uri(value: impl Into<String>) -> Self {
        Self {
            kind: "uri".to_string(),
            value: value.into(),
            datatype: None,
            lang: None,
        }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            kind: "literal".to_string(),
            value: value.into(),
            datatype: None,
            lang: None,
        }
    }

    pub fn integer(value: u64) -> Self {
        Self {
            kind: "typed-literal".to_string(),
            value: value.to_string(),
            datatype: Some("http://www.w3.org/2001/XMLSchema#integer".to_string()),
            lang: None,
        }
    }
}

/// A single solution: variable name to bound value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryRow(HashMap<String, RdfValue>);

impl QueryRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, variable: &str, value: RdfValue) -> Self {
        self.0.insert(variable.to_string(), value);
        self
    }

    pub fn get(&self, variable: &str) -> Option<&RdfValue> {
        self.0.get(variable)
    }

    /// Bound value as text, treating empty strings as unbound.
    pub fn text(&self, variable: &str) -> Option<&str> {
        self.get(variable)
            .map(|v| v.value.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn count(&self, variable: &str) -> Option<u64> {
        self.text(variable).and_then(|v| v.trim().parse().ok())
    }
}

#[derive(Deserialize)]
struct ResultsDocument {
    results: ResultsBody,
}

#[derive(Deserialize)]
struct ResultsBody {
    bindings: Vec<QueryRow>,
}

/// Parses a SELECT response body.
///
/// A body that is not a SPARQL results document yields no rows rather than an
/// error; the store answered, just not with anything usable.
pub fn parse_select_results(body: &str) -> Vec<QueryRow> {
    match serde_json::from_str::<ResultsDocument>(body) {
        Ok(doc) => doc.results.bindings,
        Err(e) => {
            warn!(
                error = %e,
                body = %truncate_body(body),
                "Unexpected SPARQL response format"
            );
            Vec::new()
        }
    }
}

// ─── Typed rows ─────────────────────────────────────────────────────────────

/// A row shape produced by one kind of query.
pub trait FromRow: Sized {
    /// Name used in error messages.
    const KIND: &'static str;

    fn from_row(row: &QueryRow) -> Option<Self>;
}

/// Converts every row, failing on the first one missing a required variable.
pub fn typed_rows<T: FromRow>(rows: &[QueryRow]) -> Result<Vec<T>, AnalysisError> {
    rows.iter()
        .map(|row| T::from_row(row).ok_or(AnalysisError::MalformedRow { what: T::KIND }))
        .collect()
}

/// `SELECT (COUNT(*) AS ?count)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountRow {
    pub count: u64,
}

impl FromRow for CountRow {
    const KIND: &'static str = "count";

    fn from_row(row: &QueryRow) -> Option<Self> {
        Some(Self {
            count: row.count("count")?,
        })
    }
}

/// `SELECT ?class (COUNT(?s) AS ?count)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassCountRow {
    pub class_uri: String,
    pub count: u64,
}

impl FromRow for ClassCountRow {
    const KIND: &'static str = "class aggregate";

    fn from_row(row: &QueryRow) -> Option<Self> {
        Some(Self {
            class_uri: row.text("class")?.to_string(),
            count: row.count("count")?,
        })
    }
}

/// `SELECT ?predicate (COUNT(*) AS ?count)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateCountRow {
    pub predicate_uri: String,
    pub count: u64,
}

impl FromRow for PredicateCountRow {
    const KIND: &'static str = "predicate aggregate";

    fn from_row(row: &QueryRow) -> Option<Self> {
        Some(Self {
            predicate_uri: row.text("predicate")?.to_string(),
            count: row.count("count")?,
        })
    }
}

/// An entity with whatever label-like values were bound for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRow {
    pub uri: String,
    /// Best label in predicate priority order, if any was bound.
    pub label: Option<String>,
    /// All bound label-like values keyed by variable name.
    pub properties: Vec<(String, String)>,
}

impl FromRow for InstanceRow {
    const KIND: &'static str = "instance";

    fn from_row(row: &QueryRow) -> Option<Self> {
        let uri = row.text("entity")?.to_string();
        let properties: Vec<(String, String)> = LABEL_PREDICATES
            .iter()
            .filter_map(|(var, _)| row.text(var).map(|v| (var.to_string(), v.to_string())))
            .collect();
        let label = properties.first().map(|(_, v)| v.clone());
        Some(Self {
            uri,
            label,
            properties,
        })
    }
}

/// `SELECT ?g (COUNT(*) AS ?count)` over named graphs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphRow {
    pub graph_uri: String,
    pub triple_count: u64,
}

impl FromRow for GraphRow {
    const KIND: &'static str = "graph";

    fn from_row(row: &QueryRow) -> Option<Self> {
        Some(Self {
            graph_uri: row.text("g")?.to_string(),
            triple_count: row.count("count")?,
        })
    }
}
