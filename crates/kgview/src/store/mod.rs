//! Access to the remote triple store.

mod client;
mod digest;
mod error;
pub mod results;

use std::time::Duration;

use async_trait::async_trait;

pub use client::HttpTripleStore;
pub use digest::DigestChallenge;
pub use error::{Result, StoreError};
pub use results::{QueryRow, RdfValue};

/// Operations the ingestion pipeline and analysis engine need from a store.
///
/// Implementations are responsible for their own retry policy; callers treat
/// an `Err` as final.
#[async_trait]
pub trait TripleStore: Send + Sync {
    /// Adds serialized triples (Turtle or N-Triples) to the named graph.
    async fn write(&self, graph_uri: &str, data: String, timeout: Duration) -> Result<()>;

    /// Runs a SPARQL SELECT and returns its solutions.
    ///
    /// A successful response that is not a results document yields no rows.
    async fn query(&self, sparql: &str, timeout: Duration) -> Result<Vec<QueryRow>>;

    /// Drops the named graph and every triple in it.
    async fn delete_graph(&self, graph_uri: &str, timeout: Duration) -> Result<()>;
}
