//! Job bookkeeping: upload job records and analysis-phase progress.

pub mod progress;
pub mod store;

pub use progress::{AnalysisProgress, AnalysisProgressStore};
pub use store::{batch_count, JobStatus, JobStore, UploadJob};
