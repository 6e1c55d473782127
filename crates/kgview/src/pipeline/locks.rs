use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::warn;

/// One async lock per graph URI, so concurrent jobs writing the same graph
/// run their uploads one after another.
#[derive(Default)]
pub struct GraphLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl GraphLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `graph_uri`; released on drop.
    pub async fn lock(&self, graph_uri: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = match self.locks.lock() {
                Ok(guard) => guard,
                Err(poisoned) => {
                    warn!("Graph lock table was poisoned, recovering");
                    poisoned.into_inner()
                }
            };
            locks
                .entry(graph_uri.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
