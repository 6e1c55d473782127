use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument};

use crate::analysis::{
    create_tabs, degraded_summary, AnalysisStrategy, LocalGraphAnalysis, ReportContext, ReportTab,
};
use crate::error::AnalysisError;
use crate::jobs::{AnalysisProgressStore, JobStatus, JobStore};
use crate::rdf::TripleSet;
use crate::store::TripleStore;

use super::config::PipelineConfig;
use super::locks::GraphLocks;
use super::progress::{JobProgress, ProgressEvent, ProgressReporter};
use super::upload::BatchUploader;

/// Drives one job from upload through analysis to its terminal state.
pub struct IngestPipeline {
    config: Arc<PipelineConfig>,
    store: Arc<dyn TripleStore>,
    uploader: BatchUploader,
    jobs: Arc<JobStore>,
    analysis_progress: Arc<AnalysisProgressStore>,
    locks: Arc<GraphLocks>,
}

impl IngestPipeline {
    pub fn new(
        config: Arc<PipelineConfig>,
        store: Arc<dyn TripleStore>,
        jobs: Arc<JobStore>,
        analysis_progress: Arc<AnalysisProgressStore>,
        locks: Arc<GraphLocks>,
    ) -> Self {
        let uploader = BatchUploader::new(store.clone(), &config);
        Self {
            config,
            store,
            uploader,
            jobs,
            analysis_progress,
            locks,
        }
    }

    pub fn jobs(&self) -> &Arc<JobStore> {
        &self.jobs
    }

    /// Run the full pipeline for one job. Every outcome, failure included,
    /// lands in the job store; the returned status is the job's final one.
    pub async fn run(&self, job_id: &str, graph_name: &str, triples: Arc<TripleSet>) -> JobStatus {
        let graph_uri = self.config.graphs.graph_uri(graph_name);
        let span = info_span!("ingest", job_id = %job_id, graph_uri = %graph_uri);
        self.run_steps(job_id, graph_name, &graph_uri, &triples)
            .instrument(span)
            .await
    }

    async fn run_steps(
        &self,
        job_id: &str,
        graph_name: &str,
        graph_uri: &str,
        triples: &TripleSet,
    ) -> JobStatus {
        let progress = JobProgress::new(job_id, self.jobs.clone(), self.analysis_progress.clone());

        // Step 1: Upload, holding the graph lock for the whole phase
        let uploaded = async {
            let _guard = self.locks.lock(graph_uri).await;
            self.uploader
                .upload(graph_uri, triples.as_slice(), &progress)
                .await
        }
        .instrument(info_span!("upload", triples = triples.len()))
        .await;

        let summary = match uploaded {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, "Upload failed");
                self.jobs.fail(job_id, &e.to_string());
                return self.final_status(job_id);
            }
        };
        info!(batches = summary.batches, triples = summary.triples, "Upload finished");

        // Step 2+3: Analyze and build the report
        let ctx = ReportContext {
            graph_name: self.config.graphs.display_name(graph_name).to_string(),
            graph_uri: graph_uri.to_string(),
            triples_count: triples.len() as u64,
            sparql_endpoint: self.config.sparql_endpoint.clone(),
        };
        let tabs = match self.analyze(triples, &ctx, &progress).await {
            Ok(tabs) => tabs,
            Err(e) => {
                warn!(error = %e, "Analysis failed, attaching degraded report");
                degraded_summary(&ctx, &e.to_string())
            }
        };

        info!(tabs = tabs.len(), "Job completed");
        self.jobs.complete(job_id, tabs);
        self.final_status(job_id)
    }

    async fn analyze(
        &self,
        triples: &TripleSet,
        ctx: &ReportContext,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<ReportTab>, AnalysisError> {
        let strategy = LocalGraphAnalysis::new(triples, self.config.analysis.top_predicates);

        let result = async {
            progress.report(ProgressEvent::Analysis {
                percent: 40.0,
                phase: "Analyzing class instances...",
            });
            let result = strategy.analyze(&ctx.graph_uri).await?;
            progress.report(ProgressEvent::Analysis {
                percent: 80.0,
                phase: "Preparing results...",
            });
            Ok::<_, AnalysisError>(result)
        }
        .instrument(info_span!("analyze", strategy = strategy.name()))
        .await?;

        create_tabs(
            &result,
            ctx,
            self.store.as_ref(),
            &self.config.analysis,
            self.config.query_timeout,
            progress,
        )
        .instrument(info_span!("report", classes = result.found_classes_count))
        .await
    }

    fn final_status(&self, job_id: &str) -> JobStatus {
        self.jobs
            .get(job_id)
            .map(|job| job.status)
            .unwrap_or(JobStatus::Failed)
    }
}
