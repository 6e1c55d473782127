//! Analysis-phase progress, tracked apart from upload progress.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Latest analysis phase reported for a job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisProgress {
    pub progress: f64,
    /// Human-readable phase, e.g. "Analyzing class instances...".
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

/// Best-effort map of job id to its latest analysis phase.
#[derive(Default)]
pub struct AnalysisProgressStore {
    entries: RwLock<HashMap<String, AnalysisProgress>>,
}

impl AnalysisProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the record for `job_id`.
    pub fn set(&self, job_id: &str, percent: f64, phase: &str) {
        let entry = AnalysisProgress {
            progress: percent.clamp(0.0, 100.0),
            status: phase.to_string(),
            timestamp: Utc::now(),
        };
        let mut entries = match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Analysis progress lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        entries.insert(job_id.to_string(), entry);
    }

    pub fn get(&self, job_id: &str) -> Option<AnalysisProgress> {
        let entries = match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Analysis progress lock was poisoned, recovering");
                poisoned.into_inner()
            }
        };
        entries.get(job_id).cloned()
    }
}
