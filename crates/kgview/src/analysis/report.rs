//! Report tabs presented to clients after an upload or graph analysis.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::entities::{distinct_samples, instance_query};
use super::{AnalysisResult, ClassEntry};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::jobs::UploadJob;
use crate::pipeline::{ProgressEvent, ProgressReporter};
use crate::rdf::local_name;
use crate::store::results::InstanceRow;
use crate::store::TripleStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabKind {
    Summary,
    Table,
}

/// Provenance of the analysed graph, repeated on every tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadInfo {
    pub status: String,
    pub message: String,
    pub graph_name: String,
    pub graph_id: String,
    pub graph_uri: String,
    pub triples_count: u64,
    pub sparql_endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_results: Option<AnalysisResult>,
}

/// A sample entity shown in a class detail tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSample {
    pub uri: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl From<InstanceRow> for InstanceSample {
    fn from(row: InstanceRow) -> Self {
        let label = row
            .label
            .unwrap_or_else(|| local_name(&row.uri).to_string());
        Self {
            uri: row.uri,
            label,
            properties: row.properties.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TabData {
    Classes(Vec<ClassEntry>),
    Instances(Vec<InstanceSample>),
}

/// One section of the analysis report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportTab {
    pub label: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: TabKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_info: Option<UploadInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<TabData>,
}

impl ReportTab {
    /// A plain summary tab with no provenance attached.
    pub fn text(label: &str, content: &str) -> Self {
        Self {
            label: label.to_string(),
            content: content.to_string(),
            kind: TabKind::Summary,
            upload_info: None,
            data: None,
        }
    }
}

/// Where the analysed data lives, for the provenance block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportContext {
    pub graph_name: String,
    pub graph_uri: String,
    pub triples_count: u64,
    pub sparql_endpoint: String,
}

impl ReportContext {
    fn upload_info(&self, status: &str, message: &str) -> UploadInfo {
        UploadInfo {
            status: status.to_string(),
            message: message.to_string(),
            graph_name: self.graph_name.clone(),
            graph_id: self.graph_name.clone(),
            graph_uri: self.graph_uri.clone(),
            triples_count: self.triples_count,
            sparql_endpoint: self.sparql_endpoint.clone(),
            analysis_results: None,
        }
    }
}

/// Formats `1234567` as `1,234,567`.
fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Assembles the summary, the classes overview and one detail tab per top class.
///
/// Detail instances always come from the store, whichever strategy produced
/// `result`.
pub async fn create_tabs(
    result: &AnalysisResult,
    ctx: &ReportContext,
    store: &dyn TripleStore,
    config: &AnalysisConfig,
    timeout: Duration,
    progress: &dyn ProgressReporter,
) -> Result<Vec<ReportTab>, AnalysisError> {
    progress.report(ProgressEvent::Analysis {
        percent: 90.0,
        phase: "Creating result tabs...",
    });

    let mut info = ctx.upload_info("Success", "TTL file uploaded and stored successfully");
    info.analysis_results = Some(result.clone());

    let summary = format!(
        "Upload Summary:\n\
         • Total Triples: {}\n\
         • Graph URI: {}\n\
         • Classes Found: {}\n\
         • Predicates Found: {}\n\n\
         Analysis completed successfully.",
        thousands(result.total_triples),
        result.graph_uri,
        result.found_classes_count,
        result.predicates_list.len(),
    );

    let mut tabs = vec![ReportTab {
        label: "Summary".to_string(),
        content: summary,
        kind: TabKind::Summary,
        upload_info: Some(info.clone()),
        data: None,
    }];

    if !result.class_list.is_empty() {
        tabs.push(ReportTab {
            label: "Classes Overview".to_string(),
            content: "Overview of RDF classes found in the graph".to_string(),
            kind: TabKind::Table,
            upload_info: Some(info.clone()),
            data: Some(TabData::Classes(result.class_list.clone())),
        });
    }

    progress.report(ProgressEvent::Analysis {
        percent: 95.0,
        phase: "Creating detailed class views...",
    });

    for class in result
        .class_list
        .iter()
        .filter(|c| c.instance_count >= 1)
        .take(config.detail_classes)
    {
        let sparql = instance_query(
            &result.graph_uri,
            &class.uri,
            None,
            config.detail_instances,
            0,
        );
        debug!(class = %class.uri, "Fetching sample instances");
        let rows = store
            .query(&sparql, timeout)
            .await
            .map_err(|source| AnalysisError::Query {
                what: "class instances",
                source,
            })?;
        let samples = distinct_samples(&rows)?;

        tabs.push(ReportTab {
            label: format!("{} ({})", class.label, class.instance_count),
            content: format!("Instances of {}", class.label),
            kind: TabKind::Table,
            upload_info: Some(info.clone()),
            data: Some(TabData::Instances(samples)),
        });
    }

    progress.report(ProgressEvent::Analysis {
        percent: 100.0,
        phase: "Analysis completed",
    });

    Ok(tabs)
}

/// Single summary tab used when analysis fails after a successful upload.
pub fn degraded_summary(ctx: &ReportContext, error: &str) -> Vec<ReportTab> {
    vec![ReportTab {
        label: "Summary".to_string(),
        content: format!(
            "Upload completed with {} triples.\nAnalysis failed: {}",
            ctx.triples_count, error
        ),
        kind: TabKind::Summary,
        upload_info: Some(ctx.upload_info("Success", "TTL file uploaded and stored successfully")),
        data: None,
    }]
}

/// Minimal result attached when an operator force-completes a job.
pub fn timeout_summary(job: &UploadJob, ctx: &ReportContext) -> Vec<ReportTab> {
    vec![ReportTab {
        label: "Summary".to_string(),
        content: format!(
            "Upload completed with {} triples.\nData analysis was skipped due to timeout.",
            job.total_triples
        ),
        kind: TabKind::Summary,
        upload_info: Some(ctx.upload_info(
            "Success (Timeout)",
            "TTL file uploaded successfully, analysis incomplete",
        )),
        data: None,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ReportContext {
        ReportContext {
            graph_name: "people".to_string(),
            graph_uri: "http://localhost:8080/graph/people".to_string(),
            triples_count: 12,
            sparql_endpoint: "http://localhost:8890/sparql".to_string(),
        }
    }

    #[test]
    fn test_thousands() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1000), "1,000");
        assert_eq!(thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_degraded_summary() {
        let tabs = degraded_summary(&ctx(), "query timed out");
        assert_eq!(tabs.len(), 1);
        assert_eq!(tabs[0].kind, TabKind::Summary);
        assert!(tabs[0].content.contains("12 triples"));
        assert!(tabs[0].content.contains("query timed out"));
        let info = tabs[0].upload_info.as_ref().unwrap();
        assert_eq!(info.graph_uri, "http://localhost:8080/graph/people");
        assert!(info.analysis_results.is_none());
    }

    #[test]
    fn test_tab_serializes_camel_case() {
        let tabs = degraded_summary(&ctx(), "x");
        let json = serde_json::to_value(&tabs[0]).unwrap();
        assert_eq!(json["type"], "summary");
        assert_eq!(json["uploadInfo"]["graphName"], "people");
        assert_eq!(json["uploadInfo"]["triplesCount"], 12);
        assert_eq!(json["uploadInfo"]["sparqlEndpoint"], "http://localhost:8890/sparql");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_instance_sample_label_fallback() {
        let sample = InstanceSample::from(InstanceRow {
            uri: "http://ex.org/people#alice".to_string(),
            label: None,
            properties: vec![],
        });
        assert_eq!(sample.label, "alice");
    }
}
