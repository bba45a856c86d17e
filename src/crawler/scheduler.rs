//! Global admission control for network operations
//!
//! Every fetch of a crawl run, whether for a seed, a link check, or a
//! recursively crawled page, goes through one counting gate. A permit is held
//! for a whole logical fetch, including all of its redirect hops.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// A counting gate shared by every fetch of a crawl
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    /// Global semaphore for limiting concurrent fetches
    semaphore: Arc<Semaphore>,

    limit: usize,
}

impl AdmissionGate {
    /// Creates a gate admitting at most `limit` operations at once
    ///
    /// A limit of zero is raised to one so that the crawl can make progress.
    pub fn new(limit: usize) -> Self {
        let limit = limit.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    /// Waits for a permit
    ///
    /// # Returns
    ///
    /// * `Some(permit)` - The caller may perform network I/O until the permit is dropped
    /// * `None` - The gate has been closed
    pub async fn admit(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.semaphore).acquire_owned().await.ok()
    }

    /// Maximum number of simultaneous operations
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of permits currently handed out
    pub fn in_flight(&self) -> usize {
        self.limit - self.semaphore.available_permits()
    }

    /// Closes the gate; pending and future `admit` calls return `None`
    pub fn close(&self) {
        self.semaphore.close();
    }
}
