use std::path::PathBuf;
use thiserror::Error;

use crate::jobs::JobStatus;
use crate::pipeline::UploadError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum KgError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Triple store error: {0}")]
    Store(#[from] StoreError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("RDF error: {0}")]
    Rdf(#[from] RdfError),

    #[error("Graph '{0}' not found or empty")]
    GraphNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Invalid value '{value}' for environment variable {name}")]
    InvalidEnv { name: String, value: String },

    #[error("Failed to resolve store password: {0}")]
    Secret(#[from] crate::secrets::SecretError),
}

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job {job_id} is not in processing state (status: {status})")]
    InvalidState { job_id: String, status: JobStatus },

    #[error("No triples to upload in '{0}'")]
    EmptyDataset(String),

    #[error("No analysis progress recorded for job {0}")]
    NoAnalysisProgress(String),
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Query for {what} failed: {source}")]
    Query {
        what: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Malformed {what} row in query result")]
    MalformedRow { what: &'static str },
}

#[derive(Error, Debug)]
pub enum RdfError {
    #[error("Failed to parse Turtle: {0}")]
    Parse(String),

    #[error("Invalid IRI '{iri}': {reason}")]
    InvalidIri { iri: String, reason: String },
}

pub type Result<T> = std::result::Result<T, KgError>;
