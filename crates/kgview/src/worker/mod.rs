pub mod pool;

pub use pool::{IngestJob, IngestWorker};
