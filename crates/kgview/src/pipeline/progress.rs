use std::sync::Arc;

use tracing::debug;

use crate::jobs::{AnalysisProgressStore, JobStore};

/// Reported after each batch has been written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    /// 1-based.
    pub batch_number: usize,
    pub batch_triples: usize,
    /// Cumulative triples written so far, including this batch.
    pub processed_triples: usize,
    pub total_triples: usize,
}

/// Events emitted by the pipeline during processing.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Batch(BatchProgress),
    Analysis { percent: f64, phase: &'static str },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// No-op reporter for flows without a job and for unit tests.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Routes pipeline events into the job store and the analysis tracker.
pub struct JobProgress {
    job_id: String,
    jobs: Arc<JobStore>,
    analysis: Arc<AnalysisProgressStore>,
}

impl JobProgress {
    pub fn new(job_id: &str, jobs: Arc<JobStore>, analysis: Arc<AnalysisProgressStore>) -> Self {
        Self {
            job_id: job_id.to_string(),
            jobs,
            analysis,
        }
    }
}

impl ProgressReporter for JobProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Batch(batch) => {
                debug!(
                    job_id = %self.job_id,
                    batch = batch.batch_number,
                    processed = batch.processed_triples,
                    total = batch.total_triples,
                    "Batch progress"
                );
                self.jobs.update_progress(
                    &self.job_id,
                    batch.batch_number,
                    batch.processed_triples,
                );
            }
            ProgressEvent::Analysis { percent, phase } => {
                self.analysis.set(&self.job_id, percent, phase);
            }
        }
    }
}
