//! In-memory job store for ingestion jobs.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::analysis::ReportTab;
use crate::error::JobError;

/// Lifecycle state of an ingestion job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Success,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Success => write!(f, "success"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One ingestion request and its tracked state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadJob {
    pub job_id: String,
    pub filename: String,
    /// As submitted; empty means the default graph.
    pub graph_name: String,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    pub status: JobStatus,
    /// Upload progress in percent, never decreasing while processing.
    pub progress: f64,
    pub total_triples: usize,
    pub processed_triples: usize,
    pub current_batch: usize,
    pub total_batches: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_data: Option<Vec<ReportTab>>,
    /// Set by an operator override; the job no longer accepts updates.
    #[serde(default)]
    pub force_completed: bool,
}

/// Number of batches `total` triples split into at `batch_size` per batch.
pub fn batch_count(total: usize, batch_size: usize) -> usize {
    total.div_ceil(batch_size.max(1))
}

fn percent(processed: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        processed as f64 / total as f64 * 100.0
    }
}

/// Thread-safe map from job id to job record.
///
/// The lock is held only while a record is read or mutated, never across
/// network calls.
pub struct JobStore {
    batch_size: usize,
    jobs: RwLock<HashMap<String, UploadJob>>,
}

impl JobStore {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            jobs: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, UploadJob>> {
        match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, UploadJob>> {
        match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Applies `f` to a job that still accepts pipeline updates.
    ///
    /// Returns `false` when the job is unknown or sealed by a force-complete.
    fn mutate(&self, job_id: &str, what: &str, f: impl FnOnce(&mut UploadJob)) -> bool {
        let mut jobs = self.write();
        match jobs.get_mut(job_id) {
            Some(job) if job.force_completed => {
                debug!(job_id, update = what, "Ignoring update to force-completed job");
                false
            }
            Some(job) => {
                f(job);
                true
            }
            None => {
                debug!(job_id, update = what, "Ignoring update to unknown job");
                false
            }
        }
    }

    /// Registers a new job in the processing state and returns its id.
    pub fn create(&self, filename: &str, graph_name: &str, total_triples: usize) -> String {
        let job_id = uuid::Uuid::new_v4().to_string();
        let job = UploadJob {
            job_id: job_id.clone(),
            filename: filename.to_string(),
            graph_name: graph_name.to_string(),
            timestamp: Utc::now(),
            status: JobStatus::Processing,
            progress: 0.0,
            total_triples,
            processed_triples: 0,
            current_batch: 0,
            total_batches: batch_count(total_triples, self.batch_size),
            error_message: None,
            result_data: None,
            force_completed: false,
        };
        self.write().insert(job_id.clone(), job);
        job_id
    }

    /// Records batch progress. Progress never moves backwards and
    /// `processed_triples` never exceeds `total_triples`.
    pub fn update_progress(&self, job_id: &str, current_batch: usize, processed_triples: usize) {
        self.mutate(job_id, "progress", |job| {
            let processed = processed_triples.min(job.total_triples);
            job.current_batch = job.current_batch.max(current_batch);
            job.processed_triples = job.processed_triples.max(processed);
            job.progress = job
                .progress
                .max(percent(job.processed_triples, job.total_triples));
        });
    }

    /// Marks a job successful with its final report.
    pub fn complete(&self, job_id: &str, result_data: Vec<ReportTab>) -> bool {
        self.mutate(job_id, "complete", |job| {
            job.status = JobStatus::Success;
            job.progress = 100.0;
            job.error_message = None;
            job.result_data = Some(result_data);
        })
    }

    pub fn fail(&self, job_id: &str, error_message: &str) -> bool {
        self.mutate(job_id, "fail", |job| {
            job.status = JobStatus::Failed;
            job.error_message = Some(error_message.to_string());
            job.result_data = None;
        })
    }

    /// Operator override: marks a processing job successful with a minimal
    /// result built by `result`, and seals it against further updates.
    pub fn force_complete(
        &self,
        job_id: &str,
        result: impl FnOnce(&UploadJob) -> Vec<ReportTab>,
    ) -> Result<UploadJob, JobError> {
        let mut jobs = self.write();
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))?;

        if job.status != JobStatus::Processing {
            return Err(JobError::InvalidState {
                job_id: job_id.to_string(),
                status: job.status,
            });
        }

        let tabs = result(job);
        job.status = JobStatus::Success;
        job.progress = 100.0;
        job.result_data = Some(tabs);
        job.force_completed = true;
        Ok(job.clone())
    }

    pub fn get(&self, job_id: &str) -> Result<UploadJob, JobError> {
        self.read()
            .get(job_id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    /// Snapshot of every job, in no particular order.
    pub fn list_all(&self) -> Vec<UploadJob> {
        self.read().values().cloned().collect()
    }

    /// (processing, success, failed) counts.
    pub fn counts(&self) -> (usize, usize, usize) {
        let jobs = self.read();
        let mut counts = (0, 0, 0);
        for job in jobs.values() {
            match job.status {
                JobStatus::Processing => counts.0 += 1,
                JobStatus::Success => counts.1 += 1,
                JobStatus::Failed => counts.2 += 1,
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ReportTab;

    fn summary_tab() -> ReportTab {
        ReportTab::text("Summary", "done")
    }

    #[test]
    fn test_create_job() {
        let store = JobStore::new(2000);
        let id = store.create("people.ttl", "people", 4500);
        let job = store.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.progress, 0.0);
        assert_eq!(job.total_batches, 3);
        assert_eq!(job.current_batch, 0);
        assert!(job.error_message.is_none());
        assert!(job.result_data.is_none());
    }

    #[test]
    fn test_ids_are_unique() {
        let store = JobStore::new(10);
        let a = store.create("a.ttl", "", 1);
        let b = store.create("a.ttl", "", 1);
        assert_ne!(a, b);
        assert_eq!(store.list_all().len(), 2);
    }

    #[test]
    fn test_batch_count() {
        assert_eq!(batch_count(5, 2000), 1);
        assert_eq!(batch_count(2000, 2000), 1);
        assert_eq!(batch_count(2001, 2000), 2);
        assert_eq!(batch_count(4500, 2000), 3);
        assert_eq!(batch_count(0, 2000), 0);
    }

    #[test]
    fn test_progress_is_monotonic_and_clamped() {
        let store = JobStore::new(100);
        let id = store.create("x.ttl", "", 300);

        store.update_progress(&id, 2, 200);
        assert!((store.get(&id).unwrap().progress - 66.666).abs() < 0.01);

        // A stale update must not move progress backwards.
        store.update_progress(&id, 1, 100);
        let job = store.get(&id).unwrap();
        assert_eq!(job.processed_triples, 200);
        assert_eq!(job.current_batch, 2);

        store.update_progress(&id, 3, 999);
        let job = store.get(&id).unwrap();
        assert_eq!(job.processed_triples, 300);
        assert_eq!(job.progress, 100.0);
    }

    #[test]
    fn test_update_unknown_job_is_noop() {
        let store = JobStore::new(100);
        store.update_progress("missing", 1, 10);
        assert!(!store.complete("missing", vec![]));
        assert!(!store.fail("missing", "boom"));
        assert!(store.list_all().is_empty());
    }

    #[test]
    fn test_complete_and_fail_last_writer_wins() {
        let store = JobStore::new(100);
        let id = store.create("x.ttl", "g", 10);

        assert!(store.fail(&id, "first"));
        assert_eq!(store.get(&id).unwrap().status, JobStatus::Failed);

        assert!(store.complete(&id, vec![summary_tab()]));
        let job = store.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Success);
        assert_eq!(job.progress, 100.0);
        assert!(job.error_message.is_none());
        assert_eq!(job.result_data.unwrap().len(), 1);
    }

    #[test]
    fn test_force_complete_seals_job() {
        let store = JobStore::new(100);
        let id = store.create("x.ttl", "g", 10);

        let job = store.force_complete(&id, |_| vec![summary_tab()]).unwrap();
        assert_eq!(job.status, JobStatus::Success);
        assert!(job.force_completed);

        // The background task finishing late must not overwrite the override.
        assert!(!store.fail(&id, "late failure"));
        store.update_progress(&id, 1, 5);
        let job = store.get(&id).unwrap();
        assert_eq!(job.status, JobStatus::Success);
        assert_eq!(job.processed_triples, 0);
        assert!(job.error_message.is_none());
    }

    #[test]
    fn test_force_complete_rejects_terminal_jobs() {
        let store = JobStore::new(100);
        let id = store.create("x.ttl", "g", 10);
        store.fail(&id, "boom");

        let err = store.force_complete(&id, |_| vec![]).unwrap_err();
        assert!(matches!(
            err,
            JobError::InvalidState {
                status: JobStatus::Failed,
                ..
            }
        ));

        let err = store.force_complete("missing", |_| vec![]).unwrap_err();
        assert!(matches!(err, JobError::NotFound(_)));
    }

    #[test]
    fn test_force_complete_succeeds_once() {
        let store = JobStore::new(100);
        let id = store.create("x.ttl", "g", 10);
        assert!(store.force_complete(&id, |_| vec![]).is_ok());
        assert!(store.force_complete(&id, |_| vec![]).is_err());
    }

    #[test]
    fn test_counts() {
        let store = JobStore::new(100);
        let a = store.create("a.ttl", "", 1);
        let b = store.create("b.ttl", "", 1);
        store.create("c.ttl", "", 1);
        store.complete(&a, vec![]);
        store.fail(&b, "x");
        assert_eq!(store.counts(), (1, 1, 1));
    }

    #[test]
    fn test_job_serializes_snake_case() {
        let store = JobStore::new(100);
        let id = store.create("a.ttl", "g", 1);
        let json = serde_json::to_value(store.get(&id).unwrap()).unwrap();
        assert_eq!(json["status"], "processing");
        assert_eq!(json["total_batches"], 1);
        assert!(json.get("error_message").is_none());
    }
}
