//! Shared fixtures: an in-memory scripted triple store and triple builders.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use kgview::config::Config;
use kgview::pipeline::{ProgressEvent, ProgressReporter};
use kgview::rdf::{vocab, TripleSet};
use kgview::store::{QueryRow, RdfValue, StoreError, TripleStore};
use oxigraph::model::{Literal, NamedNode, Triple};
use tokio::sync::Notify;

#[derive(Debug, Clone)]
pub struct RecordedWrite {
    pub graph_uri: String,
    pub payload: String,
    pub timeout: Duration,
}

impl RecordedWrite {
    pub fn triple_count(&self) -> usize {
        self.payload.lines().filter(|l| !l.trim().is_empty()).count()
    }
}

/// Triple store double. Writes are recorded; queries are answered from
/// substring-matched canned responses.
#[derive(Default)]
pub struct MockStore {
    writes: Mutex<Vec<RecordedWrite>>,
    queries: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    /// 1-based write numbers that fail.
    failing_writes: Mutex<HashSet<usize>>,
    responses: Mutex<Vec<(String, Vec<QueryRow>)>>,
    fail_queries: AtomicBool,
    write_gate: Mutex<Option<Arc<Notify>>>,
}

impl MockStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_write(&self, n: usize) {
        self.failing_writes.lock().unwrap().insert(n);
    }

    pub fn fail_queries(&self) {
        self.fail_queries.store(true, Ordering::SeqCst);
    }

    /// Answers any query containing `needle` with `rows`. Earlier entries win.
    pub fn respond(&self, needle: &str, rows: Vec<QueryRow>) {
        self.responses
            .lock()
            .unwrap()
            .push((needle.to_string(), rows));
    }

    /// Makes every write wait until the returned gate is notified.
    pub fn gate_writes(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.write_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl TripleStore for MockStore {
    async fn write(&self, graph_uri: &str, data: String, timeout: Duration) -> Result<(), StoreError> {
        let gate = self.write_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let n = {
            let mut writes = self.writes.lock().unwrap();
            writes.push(RecordedWrite {
                graph_uri: graph_uri.to_string(),
                payload: data,
                timeout,
            });
            writes.len()
        };
        if self.failing_writes.lock().unwrap().contains(&n) {
            return Err(StoreError::RetriesExhausted {
                status: 503,
                attempts: 5,
            });
        }
        Ok(())
    }

    async fn query(&self, sparql: &str, _timeout: Duration) -> Result<Vec<QueryRow>, StoreError> {
        self.queries.lock().unwrap().push(sparql.to_string());
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(StoreError::Timeout { attempts: 5 });
        }
        let responses = self.responses.lock().unwrap();
        Ok(responses
            .iter()
            .find(|(needle, _)| sparql.contains(needle.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    async fn delete_graph(&self, graph_uri: &str, _timeout: Duration) -> Result<(), StoreError> {
        self.deleted.lock().unwrap().push(graph_uri.to_string());
        Ok(())
    }
}

/// Records every progress event.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Config with no inter-batch pause and the given batch size.
pub fn test_config(batch_size: usize) -> Config {
    let mut config = Config::default();
    config.upload.batch_size = batch_size;
    config.upload.inter_batch_delay_ms = 0;
    config
}

fn node(iri: &str) -> NamedNode {
    NamedNode::new_unchecked(iri)
}

/// `n` distinct literal-valued triples.
pub fn literal_triples(n: usize) -> TripleSet {
    (0..n)
        .map(|i| {
            Triple::new(
                node(&format!("http://example.org/item/{}", i)),
                node("http://example.org/value"),
                Literal::new_simple_literal(i.to_string()),
            )
        })
        .collect()
}

/// Three instances of `ex:X` and two of `ex:Y`.
pub fn typed_triples() -> TripleSet {
    let mut set = TripleSet::new();
    for (s, class) in [("a", "X"), ("b", "X"), ("c", "X"), ("d", "Y"), ("e", "Y")] {
        set.insert(Triple::new(
            node(&format!("http://example.org/{}", s)),
            node(vocab::RDF_TYPE),
            node(&format!("http://example.org/{}", class)),
        ));
    }
    set
}

pub fn count_row(count: u64) -> QueryRow {
    QueryRow::new().with("count", RdfValue::integer(count))
}
