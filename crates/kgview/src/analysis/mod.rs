//! Structural analysis of a named graph.
//!
//! Two strategies produce the same [`AnalysisResult`]: [`LocalGraphAnalysis`]
//! scans a triple collection already in memory, [`RemoteQueryAnalysis`] asks
//! the store for aggregates. [`create_tabs`] turns a result into report tabs.

pub mod entities;
mod local;
mod remote;
mod report;

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

pub use entities::{
    entities_by_type, entity_statistics, list_graphs, EntityPage, EntityQuery, EntityStats,
    EntityType, GraphSummary, Pagination,
};
pub use local::LocalGraphAnalysis;
pub(crate) use remote::triple_count_query;
pub use remote::RemoteQueryAnalysis;
pub use report::{
    create_tabs, degraded_summary, timeout_summary, InstanceSample, ReportContext, ReportTab,
    TabData, TabKind, UploadInfo,
};

/// A class and how many distinct instances it has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassEntry {
    pub label: String,
    pub uri: String,
    pub instance_count: u64,
}

/// A predicate and how many triples use it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredicateEntry {
    pub label: String,
    pub uri: String,
    pub usage_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub graph_uri: String,
    pub total_triples: u64,
    pub found_classes_count: usize,
    /// Descending by instance count.
    pub class_list: Vec<ClassEntry>,
    /// Descending by usage count.
    pub predicates_list: Vec<PredicateEntry>,
}

/// Produces an [`AnalysisResult`] for a graph.
#[async_trait]
pub trait AnalysisStrategy: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    async fn analyze(&self, graph_uri: &str) -> Result<AnalysisResult, AnalysisError>;
}

/// Drops repeated URIs (first occurrence wins), sorts descending by count
/// keeping the relative order of ties, and truncates to `cap`.
pub(crate) fn rank<T>(
    entries: Vec<T>,
    uri: impl Fn(&T) -> &str,
    count: impl Fn(&T) -> u64,
    cap: Option<usize>,
) -> Vec<T> {
    let mut seen = HashSet::new();
    let mut unique: Vec<T> = entries
        .into_iter()
        .filter(|e| seen.insert(uri(e).to_string()))
        .collect();
    unique.sort_by(|a, b| count(b).cmp(&count(a)));
    if let Some(cap) = cap {
        unique.truncate(cap);
    }
    unique
}
