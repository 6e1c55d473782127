use std::collections::HashMap;

use async_trait::async_trait;
use oxigraph::model::Term;

use super::{rank, AnalysisResult, AnalysisStrategy, ClassEntry, PredicateEntry};
use crate::error::AnalysisError;
use crate::rdf::{local_name, vocab, TripleSet};

/// Counts classes and predicates by scanning an in-memory triple collection.
///
/// Every class asserted with `rdf:type` is reported; predicates (including
/// `rdf:type` itself) are capped at `max_predicates`.
pub struct LocalGraphAnalysis<'a> {
    triples: &'a TripleSet,
    max_predicates: usize,
}

impl<'a> LocalGraphAnalysis<'a> {
    pub fn new(triples: &'a TripleSet, max_predicates: usize) -> Self {
        Self {
            triples,
            max_predicates,
        }
    }

    fn scan(&self, graph_uri: &str) -> AnalysisResult {
        // (uri, count) in first-seen order, plus an index into it.
        let mut classes: Vec<(&str, u64)> = Vec::new();
        let mut class_index: HashMap<&str, usize> = HashMap::new();
        let mut predicates: Vec<(&str, u64)> = Vec::new();
        let mut predicate_index: HashMap<&str, usize> = HashMap::new();

        for triple in self.triples {
            let predicate = triple.predicate.as_str();
            bump(&mut predicates, &mut predicate_index, predicate);

            if predicate == vocab::RDF_TYPE {
                if let Term::NamedNode(class) = &triple.object {
                    bump(&mut classes, &mut class_index, class.as_str());
                }
            }
        }

        let class_list = rank(
            classes
                .into_iter()
                .map(|(uri, count)| ClassEntry {
                    label: local_name(uri).to_string(),
                    uri: uri.to_string(),
                    instance_count: count,
                })
                .collect(),
            |c| c.uri.as_str(),
            |c| c.instance_count,
            None,
        );
        let predicates_list = rank(
            predicates
                .into_iter()
                .map(|(uri, count)| PredicateEntry {
                    label: local_name(uri).to_string(),
                    uri: uri.to_string(),
                    usage_count: count,
                })
                .collect(),
            |p| p.uri.as_str(),
            |p| p.usage_count,
            Some(self.max_predicates),
        );

        AnalysisResult {
            graph_uri: graph_uri.to_string(),
            total_triples: self.triples.len() as u64,
            found_classes_count: class_list.len(),
            class_list,
            predicates_list,
        }
    }
}

fn bump<'t>(counts: &mut Vec<(&'t str, u64)>, index: &mut HashMap<&'t str, usize>, key: &'t str) {
    match index.get(key) {
        Some(&i) => counts[i].1 += 1,
        None => {
            index.insert(key, counts.len());
            counts.push((key, 1));
        }
    }
}

#[async_trait]
impl AnalysisStrategy for LocalGraphAnalysis<'_> {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn analyze(&self, graph_uri: &str) -> Result<AnalysisResult, AnalysisError> {
        Ok(self.scan(graph_uri))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::model::{Literal, NamedNode, Triple};

    fn node(iri: &str) -> NamedNode {
        NamedNode::new_unchecked(iri)
    }

    fn typed(subject: &str, class: &str) -> Triple {
        Triple::new(node(subject), node(vocab::RDF_TYPE), node(class))
    }

    fn sample() -> TripleSet {
        let mut set = TripleSet::new();
        for s in ["a", "b", "c"] {
            set.insert(typed(&format!("http://ex.org/{}", s), "http://ex.org/X"));
        }
        for s in ["d", "e"] {
            set.insert(typed(&format!("http://ex.org/{}", s), "http://ex.org/Y"));
        }
        set.insert(Triple::new(
            node("http://ex.org/a"),
            node("http://xmlns.com/foaf/0.1/name"),
            Literal::new_simple_literal("A"),
        ));
        set
    }

    #[tokio::test]
    async fn test_class_counts_in_descending_order() {
        let triples = sample();
        let result = LocalGraphAnalysis::new(&triples, 50)
            .analyze("http://localhost:8080/graph/g")
            .await
            .unwrap();

        assert_eq!(result.total_triples, 6);
        assert_eq!(result.found_classes_count, 2);
        assert_eq!(
            result.class_list,
            vec![
                ClassEntry {
                    label: "X".to_string(),
                    uri: "http://ex.org/X".to_string(),
                    instance_count: 3
                },
                ClassEntry {
                    label: "Y".to_string(),
                    uri: "http://ex.org/Y".to_string(),
                    instance_count: 2
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_predicate_counts() {
        let triples = sample();
        let result = LocalGraphAnalysis::new(&triples, 50)
            .analyze("g")
            .await
            .unwrap();

        assert_eq!(result.predicates_list.len(), 2);
        assert_eq!(result.predicates_list[0].uri, vocab::RDF_TYPE);
        assert_eq!(result.predicates_list[0].usage_count, 5);
        assert_eq!(result.predicates_list[1].label, "name");
        assert_eq!(result.predicates_list[1].usage_count, 1);
    }

    #[tokio::test]
    async fn test_ties_keep_source_order() {
        let mut set = TripleSet::new();
        set.insert(typed("http://ex.org/1", "http://ex.org/B"));
        set.insert(typed("http://ex.org/2", "http://ex.org/A"));
        set.insert(typed("http://ex.org/3", "http://ex.org/C"));
        set.insert(typed("http://ex.org/4", "http://ex.org/C"));

        let result = LocalGraphAnalysis::new(&set, 50).analyze("g").await.unwrap();
        let labels: Vec<&str> = result.class_list.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["C", "B", "A"]);
    }

    #[tokio::test]
    async fn test_predicates_capped() {
        let mut set = TripleSet::new();
        for i in 0..60 {
            set.insert(Triple::new(
                node("http://ex.org/s"),
                node(&format!("http://ex.org/p{}", i)),
                Literal::new_simple_literal("v"),
            ));
        }
        let result = LocalGraphAnalysis::new(&set, 50).analyze("g").await.unwrap();
        assert_eq!(result.predicates_list.len(), 50);
        assert!(result.class_list.is_empty());
    }
}
