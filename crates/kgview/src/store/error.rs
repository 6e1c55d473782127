//! Triple store error types.

use thiserror::Error;

/// Errors raised by reads and writes against the remote triple store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Every attempt timed out.
    #[error("Request timed out after {attempts} attempt(s)")]
    Timeout { attempts: u32 },

    /// Connection-level failure that survived the retry budget.
    #[error("Transport error after {attempts} attempt(s): {message}")]
    Transport { attempts: u32, message: String },

    /// The store kept answering with a retryable status.
    #[error("Store answered HTTP {status} after {attempts} attempt(s)")]
    RetriesExhausted { status: u16, attempts: u32 },

    /// Non-retryable status; surfaced immediately.
    #[error("Store rejected request with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The store refused the configured credentials.
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Graph not found: {0}")]
    GraphNotFound(String),

    /// The request could not be built (bad endpoint, bad header value).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
