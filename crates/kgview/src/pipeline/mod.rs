pub mod config;
pub mod error;
pub mod locks;
pub mod progress;
pub mod runner;
pub mod upload;

pub use config::PipelineConfig;
pub use error::UploadError;
pub use locks::GraphLocks;
pub use progress::{BatchProgress, JobProgress, NoopProgress, ProgressEvent, ProgressReporter};
pub use runner::IngestPipeline;
pub use upload::{BatchUploader, UploadSummary};
