use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::jobs::JobStatus;
use crate::pipeline::IngestPipeline;
use crate::rdf::TripleSet;

/// A job ready to run: already registered in the job store.
pub struct IngestJob {
    pub job_id: String,
    pub graph_name: String,
    pub triples: Arc<TripleSet>,
}

/// Runs each ingestion job on its own tokio task.
///
/// With `max_concurrent` set, tasks wait for a permit before starting;
/// otherwise every submitted job starts at once.
pub struct IngestWorker {
    pipeline: Arc<IngestPipeline>,
    permits: Option<Arc<Semaphore>>,
    handles: Mutex<HashMap<String, JoinHandle<JobStatus>>>,
}

impl IngestWorker {
    pub fn new(pipeline: Arc<IngestPipeline>, max_concurrent: Option<usize>) -> Self {
        let permits = max_concurrent.map(|n| Arc::new(Semaphore::new(n.max(1))));
        match max_concurrent {
            Some(n) => info!("Ingest worker limited to {} concurrent jobs", n.max(1)),
            None => info!("Ingest worker started without a concurrency limit"),
        }
        Self {
            pipeline,
            permits,
            handles: Mutex::new(HashMap::new()),
        }
    }

    fn handles(&self) -> MutexGuard<'_, HashMap<String, JoinHandle<JobStatus>>> {
        match self.handles.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Worker handle table was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Starts the job in the background and returns immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&self, job: IngestJob) {
        let pipeline = Arc::clone(&self.pipeline);
        let permits = self.permits.clone();
        let key = job.job_id.clone();

        let handle = tokio::spawn(async move {
            let _permit = match permits {
                Some(sem) => sem.acquire_owned().await.ok(),
                None => None,
            };
            debug!(job_id = %job.job_id, "Ingest task started");

            // Run on an inner task so a panic surfaces as a JoinError here
            // instead of leaving the job stuck in processing.
            let runner = Arc::clone(&pipeline);
            let IngestJob {
                job_id,
                graph_name,
                triples,
            } = job;
            let inner_id = job_id.clone();
            let result = tokio::spawn(async move {
                runner.run(&inner_id, &graph_name, triples).await
            })
            .await;

            match result {
                Ok(status) => status,
                Err(e) => {
                    error!(job_id = %job_id, error = %e, "Ingest task aborted");
                    pipeline
                        .jobs()
                        .fail(&job_id, &format!("Ingestion task aborted: {}", e));
                    JobStatus::Failed
                }
            }
        });

        let mut handles = self.handles();
        // A finished task has already written its job's terminal state.
        handles.retain(|_, h| !h.is_finished());
        handles.insert(key, handle);
    }

    /// Waits for a submitted job's task to end. `None` if the job was never
    /// submitted here, has already been awaited, or finished and was pruned.
    pub async fn wait(&self, job_id: &str) -> Option<JobStatus> {
        let handle = self.handles().remove(job_id)?;
        match handle.await {
            Ok(status) => Some(status),
            Err(e) => {
                error!(job_id, error = %e, "Ingest supervisor task failed");
                Some(JobStatus::Failed)
            }
        }
    }
}
