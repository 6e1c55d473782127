//! Entry points used by the outer layer: job submission and status, plus the
//! administrative graph operations.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::{
    self, create_tabs, timeout_summary, AnalysisResult, AnalysisStrategy, EntityPage, EntityQuery,
    EntityStats, GraphSummary, RemoteQueryAnalysis, ReportContext, ReportTab,
};
use crate::config::Config;
use crate::error::{JobError, KgError, Result};
use crate::jobs::{AnalysisProgress, AnalysisProgressStore, JobStatus, JobStore, UploadJob};
use crate::pipeline::{GraphLocks, IngestPipeline, NoopProgress, PipelineConfig};
use crate::rdf::TripleSet;
use crate::secrets::StoreCredentials;
use crate::store::results::{typed_rows, CountRow};
use crate::store::{HttpTripleStore, StoreError, TripleStore};
use crate::worker::{IngestJob, IngestWorker};

/// Checks that a graph name can be used as the last segment of a graph URI.
///
/// The empty name is accepted and stands for the default graph.
pub fn check_graph_name(name: &str) -> std::result::Result<(), String> {
    let name = name.trim();
    if let Some(c) = name
        .chars()
        .find(|c| c.is_whitespace() || matches!(c, '/' | '<' | '>' | '"'))
    {
        return Err(format!("graph name '{}' contains invalid character {:?}", name, c));
    }
    Ok(())
}

/// A job record as returned by status queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusView {
    #[serde(flatten)]
    pub job: UploadJob,
    /// Absent until the analysis phase has started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_progress: Option<AnalysisProgress>,
    /// Computed live for successful jobs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_stats: Option<EntityStats>,
}

/// Analysis of a graph already in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphAnalysis {
    pub graph_name: String,
    pub graph_uri: String,
    pub tabs: Vec<ReportTab>,
    pub analysis: AnalysisResult,
}

pub struct KgService {
    config: Arc<PipelineConfig>,
    store: Arc<dyn TripleStore>,
    jobs: Arc<JobStore>,
    analysis_progress: Arc<AnalysisProgressStore>,
    worker: IngestWorker,
}

impl KgService {
    /// Production constructor: HTTP store with credentials from the config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let credentials =
            StoreCredentials::from_config(&config.store).map_err(crate::error::ConfigError::from)?;
        let store = HttpTripleStore::new(&config.store, credentials)?;
        Ok(Self::new(config, Arc::new(store)))
    }

    /// Builds the service around any store implementation.
    pub fn new(config: &Config, store: Arc<dyn TripleStore>) -> Self {
        let pipeline_config = Arc::new(PipelineConfig::from_config(config));
        let jobs = Arc::new(JobStore::new(pipeline_config.batch_size));
        let analysis_progress = Arc::new(AnalysisProgressStore::new());
        let pipeline = Arc::new(IngestPipeline::new(
            pipeline_config.clone(),
            store.clone(),
            jobs.clone(),
            analysis_progress.clone(),
            Arc::new(GraphLocks::new()),
        ));
        let worker = IngestWorker::new(pipeline, config.worker.max_concurrent_jobs);

        Self {
            config: pipeline_config,
            store,
            jobs,
            analysis_progress,
            worker,
        }
    }

    pub fn jobs(&self) -> &JobStore {
        &self.jobs
    }

    fn graph_uri(&self, graph_name: &str) -> Result<String> {
        check_graph_name(graph_name).map_err(KgError::InvalidInput)?;
        Ok(self.config.graphs.graph_uri(graph_name))
    }

    /// Registers a job and starts its upload in the background.
    ///
    /// Returns as soon as the job exists; progress and failures are observed
    /// through [`get_status`](Self::get_status).
    pub fn submit(&self, filename: &str, graph_name: &str, triples: TripleSet) -> Result<String> {
        check_graph_name(graph_name).map_err(KgError::InvalidInput)?;
        if triples.is_empty() {
            return Err(JobError::EmptyDataset(filename.to_string()).into());
        }

        let job_id = self.jobs.create(filename, graph_name, triples.len());
        let (processing, _, _) = self.jobs.counts();
        info!(
            job_id = %job_id,
            filename,
            graph = %self.config.graphs.display_name(graph_name),
            triples = triples.len(),
            processing,
            "Job submitted"
        );
        self.worker.submit(IngestJob {
            job_id: job_id.clone(),
            graph_name: graph_name.to_string(),
            triples: Arc::new(triples),
        });
        Ok(job_id)
    }

    pub async fn get_status(&self, job_id: &str) -> Result<JobStatusView> {
        let job = self.jobs.get(job_id)?;
        let entity_stats = if job.status == JobStatus::Success {
            let graph_uri = self.config.graphs.graph_uri(&job.graph_name);
            Some(
                analysis::entity_statistics(
                    self.store.as_ref(),
                    &graph_uri,
                    self.config.query_timeout,
                )
                .await,
            )
        } else {
            None
        };

        Ok(JobStatusView {
            analysis_progress: self.analysis_progress.get(job_id),
            job,
            entity_stats,
        })
    }

    pub fn analysis_progress(&self, job_id: &str) -> Result<AnalysisProgress> {
        self.analysis_progress
            .get(job_id)
            .ok_or_else(|| JobError::NoAnalysisProgress(job_id.to_string()).into())
    }

    pub fn list_jobs(&self) -> Vec<UploadJob> {
        self.jobs.list_all()
    }

    /// Marks a stuck job successful without waiting for its analysis.
    pub fn force_complete(&self, job_id: &str) -> Result<UploadJob> {
        let graphs = &self.config.graphs;
        let endpoint = &self.config.sparql_endpoint;
        let job = self.jobs.force_complete(job_id, |job| {
            let ctx = ReportContext {
                graph_name: graphs.display_name(&job.graph_name).to_string(),
                graph_uri: graphs.graph_uri(&job.graph_name),
                triples_count: job.total_triples as u64,
                sparql_endpoint: endpoint.clone(),
            };
            timeout_summary(job, &ctx)
        })?;
        info!(job_id, "Job force-completed");
        Ok(job)
    }

    /// Waits for the job's background task, then returns the job record.
    pub async fn wait_for(&self, job_id: &str) -> Result<UploadJob> {
        self.worker.wait(job_id).await;
        Ok(self.jobs.get(job_id)?)
    }

    pub async fn list_graphs(&self) -> Result<Vec<GraphSummary>> {
        Ok(analysis::list_graphs(
            self.store.as_ref(),
            &self.config.graphs,
            self.config.query_timeout,
        )
        .await?)
    }

    async fn triple_count(&self, graph_uri: &str) -> Result<u64> {
        let rows = self
            .store
            .query(
                &analysis::triple_count_query(graph_uri),
                self.config.query_timeout,
            )
            .await?;
        Ok(typed_rows::<CountRow>(&rows)?
            .first()
            .map(|r| r.count)
            .unwrap_or(0))
    }

    /// Analyses a graph already in the store.
    pub async fn analyze_graph(&self, graph_name: &str) -> Result<GraphAnalysis> {
        let graph_uri = self.graph_uri(graph_name)?;
        let display = self.config.graphs.display_name(graph_name).to_string();

        let strategy = RemoteQueryAnalysis::new(
            self.store.clone(),
            &self.config.analysis,
            self.config.query_timeout,
        );
        let result = strategy.analyze(&graph_uri).await?;
        if result.total_triples == 0 {
            return Err(KgError::GraphNotFound(display));
        }

        let ctx = ReportContext {
            graph_name: display.clone(),
            graph_uri: graph_uri.clone(),
            triples_count: result.total_triples,
            sparql_endpoint: self.config.sparql_endpoint.clone(),
        };
        let tabs = create_tabs(
            &result,
            &ctx,
            self.store.as_ref(),
            &self.config.analysis,
            self.config.query_timeout,
            &NoopProgress,
        )
        .await?;

        Ok(GraphAnalysis {
            graph_name: display,
            graph_uri,
            tabs,
            analysis: result,
        })
    }

    /// Drops a graph. Fails with `GraphNotFound` if it holds no triples.
    pub async fn delete_graph(&self, graph_name: &str) -> Result<()> {
        let graph_uri = self.graph_uri(graph_name)?;
        let display = self.config.graphs.display_name(graph_name).to_string();

        if self.triple_count(&graph_uri).await? == 0 {
            return Err(KgError::GraphNotFound(display));
        }

        match self
            .store
            .delete_graph(&graph_uri, self.config.query_timeout)
            .await
        {
            Ok(()) => {
                info!(graph = %graph_uri, "Graph deleted");
                Ok(())
            }
            Err(StoreError::GraphNotFound(_)) => Err(KgError::GraphNotFound(display)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn entity_statistics(&self, graph_name: &str) -> Result<EntityStats> {
        let graph_uri = self.graph_uri(graph_name)?;
        Ok(analysis::entity_statistics(
            self.store.as_ref(),
            &graph_uri,
            self.config.query_timeout,
        )
        .await)
    }

    pub async fn entities_by_type(
        &self,
        graph_name: &str,
        query: &EntityQuery,
    ) -> Result<EntityPage> {
        let graph_uri = self.graph_uri(graph_name)?;
        analysis::entities_by_type(
            self.store.as_ref(),
            &graph_uri,
            query,
            self.config.query_timeout,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_graph_name() {
        assert!(check_graph_name("").is_ok());
        assert!(check_graph_name("people").is_ok());
        assert!(check_graph_name("people-2024_v1.0").is_ok());
        assert!(check_graph_name("a/b").is_err());
        assert!(check_graph_name("a b").is_err());
        assert!(check_graph_name("<x>").is_err());
        assert!(check_graph_name("say\"hi").is_err());
    }
}
