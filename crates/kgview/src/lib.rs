pub mod analysis;
pub mod config;
pub mod error;
pub mod jobs;
pub mod pipeline;
pub mod rdf;
pub mod sanitize;
pub mod secrets;
pub mod service;
pub mod store;
pub mod worker;

pub use analysis::{AnalysisResult, EntityQuery, ReportTab};
pub use config::{load_config, load_config_from_str, Config};
pub use error::{AnalysisError, ConfigError, JobError, KgError, RdfError, Result};
pub use jobs::{AnalysisProgress, JobStatus, JobStore, UploadJob};
pub use pipeline::{BatchUploader, IngestPipeline, PipelineConfig, UploadError};
pub use rdf::{parse_turtle, TripleSet};
pub use secrets::{resolve_secret, SecretError, StoreCredentials};
pub use service::{GraphAnalysis, JobStatusView, KgService};
pub use store::{HttpTripleStore, StoreError, TripleStore};
