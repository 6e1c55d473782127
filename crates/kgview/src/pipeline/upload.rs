use std::sync::Arc;
use std::time::Duration;

use oxigraph::model::Triple;
use tracing::{debug, info, warn};

use super::config::PipelineConfig;
use super::error::UploadError;
use super::progress::{BatchProgress, ProgressEvent, ProgressReporter};
use crate::jobs::batch_count;
use crate::rdf::serialize_triples;
use crate::store::TripleStore;

/// What a successful upload wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSummary {
    pub batches: usize,
    pub triples: usize,
}

/// Streams triples to the store in bounded batches.
pub struct BatchUploader {
    store: Arc<dyn TripleStore>,
    batch_size: usize,
    inter_batch_delay: Duration,
    single_timeout: Duration,
    batch_timeout: Duration,
}

impl BatchUploader {
    pub fn new(store: Arc<dyn TripleStore>, config: &PipelineConfig) -> Self {
        Self {
            store,
            batch_size: config.batch_size.max(1),
            inter_batch_delay: config.inter_batch_delay,
            single_timeout: config.single_upload_timeout,
            batch_timeout: config.batch_upload_timeout,
        }
    }

    /// Writes `triples` into `graph_uri` in source order.
    ///
    /// A collection no larger than one batch goes out in a single write with
    /// the long timeout. Larger ones are split into `batch_size` chunks, each
    /// serialized on its own; the first failing chunk aborts the upload and
    /// earlier chunks stay in the store.
    pub async fn upload(
        &self,
        graph_uri: &str,
        triples: &[Triple],
        progress: &dyn ProgressReporter,
    ) -> Result<UploadSummary, UploadError> {
        let total = triples.len();
        if total == 0 {
            debug!(graph = graph_uri, "Nothing to upload");
            return Ok(UploadSummary {
                batches: 0,
                triples: 0,
            });
        }

        if total <= self.batch_size {
            info!(graph = graph_uri, triples = total, "Uploading in a single request");
            self.store
                .write(graph_uri, serialize_triples(triples), self.single_timeout)
                .await
                .map_err(|source| UploadError::Single {
                    triples: total,
                    source,
                })?;
            progress.report(ProgressEvent::Batch(BatchProgress {
                batch_number: 1,
                batch_triples: total,
                processed_triples: total,
                total_triples: total,
            }));
            return Ok(UploadSummary {
                batches: 1,
                triples: total,
            });
        }

        let total_batches = batch_count(total, self.batch_size);
        info!(
            graph = graph_uri,
            triples = total,
            batches = total_batches,
            batch_size = self.batch_size,
            "Uploading in batches"
        );

        let mut processed = 0;
        for (index, chunk) in triples.chunks(self.batch_size).enumerate() {
            let batch = index + 1;
            debug!(batch, total_batches, size = chunk.len(), "Writing batch");

            if let Err(source) = self
                .store
                .write(graph_uri, serialize_triples(chunk), self.batch_timeout)
                .await
            {
                warn!(batch, total_batches, processed, error = %source, "Batch upload failed");
                return Err(UploadError::Batch {
                    batch,
                    total_batches,
                    processed,
                    source,
                });
            }

            processed += chunk.len();
            progress.report(ProgressEvent::Batch(BatchProgress {
                batch_number: batch,
                batch_triples: chunk.len(),
                processed_triples: processed,
                total_triples: total,
            }));

            if batch < total_batches && !self.inter_batch_delay.is_zero() {
                tokio::time::sleep(self.inter_batch_delay).await;
            }
        }

        Ok(UploadSummary {
            batches: total_batches,
            triples: processed,
        })
    }
}
