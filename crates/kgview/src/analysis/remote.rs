use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{rank, AnalysisResult, AnalysisStrategy, ClassEntry, PredicateEntry};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::rdf::{local_name, vocab};
use crate::store::results::{typed_rows, ClassCountRow, CountRow, PredicateCountRow};
use crate::store::{QueryRow, TripleStore};

/// Builds an analysis from three aggregate queries against the store.
pub struct RemoteQueryAnalysis {
    store: Arc<dyn TripleStore>,
    max_classes: usize,
    max_predicates: usize,
    timeout: Duration,
}

impl RemoteQueryAnalysis {
    pub fn new(store: Arc<dyn TripleStore>, config: &AnalysisConfig, timeout: Duration) -> Self {
        Self {
            store,
            max_classes: config.top_classes,
            max_predicates: config.top_predicates,
            timeout,
        }
    }

    async fn run(&self, what: &'static str, sparql: &str) -> Result<Vec<QueryRow>, AnalysisError> {
        debug!(query = what, "Running analysis query");
        self.store
            .query(sparql, self.timeout)
            .await
            .map_err(|source| AnalysisError::Query { what, source })
    }
}

pub(crate) fn triple_count_query(graph_uri: &str) -> String {
    format!(
        "SELECT (COUNT(*) AS ?count) FROM <{}> WHERE {{ ?s ?p ?o }}",
        graph_uri
    )
}

fn class_query(graph_uri: &str, limit: usize) -> String {
    format!(
        "SELECT ?class (COUNT(DISTINCT ?s) AS ?count) FROM <{}> WHERE {{ ?s a ?class }} \
         GROUP BY ?class ORDER BY DESC(?count) LIMIT {}",
        graph_uri, limit
    )
}

fn predicate_query(graph_uri: &str, limit: usize) -> String {
    format!(
        "SELECT ?predicate (COUNT(*) AS ?count) FROM <{}> WHERE {{ ?s ?predicate ?o \
         FILTER(?predicate != <{}>) }} GROUP BY ?predicate ORDER BY DESC(?count) LIMIT {}",
        graph_uri,
        vocab::RDF_TYPE,
        limit
    )
}

#[async_trait]
impl AnalysisStrategy for RemoteQueryAnalysis {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn analyze(&self, graph_uri: &str) -> Result<AnalysisResult, AnalysisError> {
        let rows = self
            .run("triple count", &triple_count_query(graph_uri))
            .await?;
        let total_triples = typed_rows::<CountRow>(&rows)?
            .first()
            .map(|r| r.count)
            .unwrap_or(0);

        let rows = self
            .run("classes", &class_query(graph_uri, self.max_classes))
            .await?;
        let classes: Vec<ClassEntry> = typed_rows::<ClassCountRow>(&rows)?
            .into_iter()
            .map(|row| ClassEntry {
                label: local_name(&row.class_uri).to_string(),
                uri: row.class_uri,
                instance_count: row.count,
            })
            .collect();
        let class_list = rank(
            classes,
            |c| c.uri.as_str(),
            |c| c.instance_count,
            Some(self.max_classes),
        );

        let rows = self
            .run("predicates", &predicate_query(graph_uri, self.max_predicates))
            .await?;
        let predicates: Vec<PredicateEntry> = typed_rows::<PredicateCountRow>(&rows)?
            .into_iter()
            .map(|row| PredicateEntry {
                label: local_name(&row.predicate_uri).to_string(),
                uri: row.predicate_uri,
                usage_count: row.count,
            })
            .collect();
        let predicates_list = rank(
            predicates,
            |p| p.uri.as_str(),
            |p| p.usage_count,
            Some(self.max_predicates),
        );

        Ok(AnalysisResult {
            graph_uri: graph_uri.to_string(),
            total_triples,
            found_classes_count: class_list.len(),
            class_list,
            predicates_list,
        })
    }
}
