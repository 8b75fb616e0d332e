//! The page-side host that owns the worker and delivers events to it.

use std::sync::Arc;

use tally_client::worker::ActivateReport;
use tally_client::{Fetcher, ServiceWorker};
use tally_core::{CacheDb, Error};
use tokio::sync::RwLock;
use url::Url;

/// Shared state behind every tool call.
///
/// Fetch, sync and push take the worker's read lock and may run
/// concurrently; install, activate and message take the write lock.
pub struct Host {
    pub db: CacheDb,
    pub origin: Url,
    /// Used directly for requests the worker declines to intercept.
    pub fetcher: Arc<dyn Fetcher>,
    pub worker: RwLock<ServiceWorker>,
}

impl Host {
    /// `worker` is built on the same `db`, usually by [`ServiceWorker::restore`].
    pub fn new(worker: ServiceWorker, db: CacheDb, fetcher: Arc<dyn Fetcher>) -> Self {
        let origin = worker.config().origin.clone();
        Self { db, origin, fetcher, worker: RwLock::new(worker) }
    }
}

/// Activate right away if the worker asked to skip waiting.
pub(crate) async fn activate_if_requested(worker: &mut ServiceWorker) -> Result<Option<ActivateReport>, Error> {
    if !worker.should_activate() {
        return Ok(None);
    }
    tracing::info!(cache = worker.cache_name(), "skip waiting; activating now");
    worker.activate().await.map(Some)
}
