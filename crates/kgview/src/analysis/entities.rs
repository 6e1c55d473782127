//! Live entity queries: type statistics, paginated listings and graph inventory.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::report::InstanceSample;
use crate::config::GraphConfig;
use crate::error::{AnalysisError, KgError};
use crate::rdf::{escape_literal, local_name, validate_iri, vocab::LABEL_PREDICATES};
use crate::store::results::{typed_rows, ClassCountRow, CountRow, GraphRow, InstanceRow};
use crate::store::{QueryRow, TripleStore};

/// Entities per page when the caller does not say.
pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityType {
    pub uri: String,
    /// Fragment or last path segment of the type URI.
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityStats {
    pub entity_types: Vec<EntityType>,
    pub total_types: usize,
    pub total_entities: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Counts entities per `rdf:type` in a graph.
///
/// Failures are reported inside the returned value rather than as an error so
/// that a status response can still be produced.
pub async fn entity_statistics(
    store: &dyn TripleStore,
    graph_uri: &str,
    timeout: Duration,
) -> EntityStats {
    let sparql = format!(
        "SELECT ?class (COUNT(?entity) AS ?count) FROM <{}> WHERE {{ ?entity a ?class }} \
         GROUP BY ?class ORDER BY DESC(?count)",
        graph_uri
    );

    let rows = match store.query(&sparql, timeout).await {
        Ok(rows) => rows,
        Err(e) => {
            warn!(graph = graph_uri, error = %e, "Entity statistics query failed");
            return EntityStats {
                error: Some(e.to_string()),
                ..Default::default()
            };
        }
    };
    let rows = match typed_rows::<ClassCountRow>(&rows) {
        Ok(rows) => rows,
        Err(e) => {
            return EntityStats {
                error: Some(e.to_string()),
                ..Default::default()
            }
        }
    };

    let entity_types: Vec<EntityType> = rows
        .into_iter()
        .map(|row| EntityType {
            name: local_name(&row.class_uri).to_string(),
            uri: row.class_uri,
            count: row.count,
        })
        .collect();

    EntityStats {
        total_types: entity_types.len(),
        total_entities: entity_types.iter().map(|t| t.count).sum(),
        entity_types,
        error: None,
    }
}

/// Parameters for [`entities_by_type`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityQuery {
    pub type_uri: String,
    /// 1-based.
    pub page: usize,
    pub limit: usize,
    /// Case-insensitive substring matched against the URI and labels.
    pub search: Option<String>,
}

impl EntityQuery {
    pub fn new(type_uri: impl Into<String>) -> Self {
        Self {
            type_uri: type_uri.into(),
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            search: None,
        }
    }

    fn page(&self) -> usize {
        self.page.max(1)
    }

    fn limit(&self) -> usize {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }

    fn search(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: u64,
    pub pages: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityPage {
    pub entities: Vec<InstanceSample>,
    pub pagination: Pagination,
}

/// Group pattern selecting entities of `type_uri`, optionally filtered by a
/// search over the URI and label-like values.
fn entity_where(type_uri: &str, search: Option<&str>) -> String {
    let mut pattern = format!("{{ ?entity a <{}> .", type_uri);
    if let Some(search) = search {
        pattern.push_str(&label_optionals());
        let needle = escape_literal(search);
        let clauses: Vec<String> = std::iter::once("entity")
            .chain(LABEL_PREDICATES.iter().map(|(var, _)| *var))
            .map(|var| format!("CONTAINS(LCASE(STR(?{})), LCASE(\"{}\"))", var, needle))
            .collect();
        pattern.push_str(&format!(" FILTER ({})", clauses.join(" || ")));
    }
    pattern.push_str(" }");
    pattern
}

fn label_optionals() -> String {
    LABEL_PREDICATES
        .iter()
        .map(|(var, predicate)| format!(" OPTIONAL {{ ?entity <{}> ?{} }}", predicate, var))
        .collect()
}

/// SELECT for one page of entities of a type with their label-like values.
///
/// Paging applies to distinct entities in a subquery; labels are joined
/// afterwards, so an entity with several labels still yields several rows.
pub(crate) fn instance_query(
    graph_uri: &str,
    type_uri: &str,
    search: Option<&str>,
    limit: usize,
    offset: usize,
) -> String {
    let vars: Vec<String> = LABEL_PREDICATES
        .iter()
        .map(|(var, _)| format!("?{}", var))
        .collect();
    format!(
        "SELECT ?entity {} FROM <{}> WHERE {{ {{ SELECT DISTINCT ?entity WHERE {} \
         ORDER BY ?entity LIMIT {} OFFSET {} }}{} }} ORDER BY ?entity",
        vars.join(" "),
        graph_uri,
        entity_where(type_uri, search),
        limit,
        offset,
        label_optionals()
    )
}

/// One sample per entity URI, first row wins, in result order.
pub(crate) fn distinct_samples(rows: &[QueryRow]) -> Result<Vec<InstanceSample>, AnalysisError> {
    let mut seen = HashSet::new();
    Ok(typed_rows::<InstanceRow>(rows)?
        .into_iter()
        .filter(|row| seen.insert(row.uri.clone()))
        .map(InstanceSample::from)
        .collect())
}

/// One page of entities of a given type.
pub async fn entities_by_type(
    store: &dyn TripleStore,
    graph_uri: &str,
    query: &EntityQuery,
    timeout: Duration,
) -> Result<EntityPage, KgError> {
    let type_uri = validate_iri(query.type_uri.trim())?;
    let page = query.page();
    let limit = query.limit();
    let search = query.search();

    let count_sparql = format!(
        "SELECT (COUNT(DISTINCT ?entity) AS ?count) FROM <{}> WHERE {}",
        graph_uri,
        entity_where(type_uri.as_str(), search)
    );
    let rows = store
        .query(&count_sparql, timeout)
        .await
        .map_err(|source| AnalysisError::Query {
            what: "entity count",
            source,
        })?;
    let total = typed_rows::<CountRow>(&rows)?
        .first()
        .map(|r| r.count)
        .unwrap_or(0);

    let data_sparql = instance_query(
        graph_uri,
        type_uri.as_str(),
        search,
        limit,
        (page - 1) * limit,
    );
    let rows = store
        .query(&data_sparql, timeout)
        .await
        .map_err(|source| AnalysisError::Query {
            what: "entities",
            source,
        })?;

    let entities = distinct_samples(&rows)?;

    Ok(EntityPage {
        entities,
        pagination: Pagination {
            page,
            limit,
            total,
            pages: total.div_ceil(limit as u64),
        },
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSummary {
    pub name: String,
    pub uri: String,
    pub triple_count: u64,
}

/// Named graphs under the configured base URI, with their sizes.
pub async fn list_graphs(
    store: &dyn TripleStore,
    graphs: &GraphConfig,
    timeout: Duration,
) -> Result<Vec<GraphSummary>, AnalysisError> {
    let prefix = format!("{}/", graphs.base_uri.trim_end_matches('/'));
    let sparql = format!(
        "SELECT ?g (COUNT(*) AS ?count) WHERE {{ GRAPH ?g {{ ?s ?p ?o }} \
         FILTER(STRSTARTS(STR(?g), \"{}\")) }} GROUP BY ?g ORDER BY ?g",
        escape_literal(&prefix)
    );
    let rows = store
        .query(&sparql, timeout)
        .await
        .map_err(|source| AnalysisError::Query {
            what: "graphs",
            source,
        })?;

    Ok(typed_rows::<GraphRow>(&rows)?
        .into_iter()
        .filter_map(|row| {
            let name = graphs.graph_name(&row.graph_uri)?.to_string();
            Some(GraphSummary {
                name,
                uri: row.graph_uri,
                triple_count: row.triple_count,
            })
        })
        .collect())
}
