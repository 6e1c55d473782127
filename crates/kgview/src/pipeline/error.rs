use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Upload of {triples} triples failed: {source}")]
    Single {
        triples: usize,
        #[source]
        source: StoreError,
    },

    /// Batches before `batch` stay in the store; nothing is rolled back.
    #[error("Batch {batch}/{total_batches} failed after {processed} triples were stored: {source}")]
    Batch {
        batch: usize,
        total_batches: usize,
        processed: usize,
        #[source]
        source: StoreError,
    },
}
