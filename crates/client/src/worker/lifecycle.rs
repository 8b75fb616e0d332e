//! Cache lifecycle: install populates the versioned bucket, activate removes
//! every other bucket.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::{join_all, try_join_all};
use tally_core::{CacheDb, Destination, Error, Request, Response};
use url::Url;

use crate::fetch::Fetcher;

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub cache_name: String,
    pub precached: usize,
    /// Install asks to activate without waiting for open clients to close.
    pub skip_waiting: bool,
}

/// Result of an activate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivateReport {
    pub cache_name: String,
    pub deleted: Vec<String>,
    /// Stale buckets that could not be removed, with the reason.
    pub failed: Vec<(String, String)>,
    pub clients_claimed: bool,
}

/// Bucket enumeration and removal used to clean up after activation.
#[async_trait]
pub trait BucketStore: Send + Sync {
    async fn bucket_names(&self) -> Result<Vec<String>, Error>;

    /// Returns false if no bucket had that name.
    async fn delete_bucket(&self, name: &str) -> Result<bool, Error>;
}

#[async_trait]
impl BucketStore for CacheDb {
    async fn bucket_names(&self) -> Result<Vec<String>, Error> {
        CacheDb::bucket_names(self).await
    }

    async fn delete_bucket(&self, name: &str) -> Result<bool, Error> {
        CacheDb::delete_bucket(self, name).await
    }
}

/// Owns the current bucket's creation, population and garbage collection.
pub struct LifecycleManager {
    db: CacheDb,
    store: Arc<dyn BucketStore>,
    cache_name: String,
    precache: Vec<Url>,
    fetcher: Arc<dyn Fetcher>,
}

impl LifecycleManager {
    pub fn new(db: CacheDb, cache_name: impl Into<String>, precache: Vec<Url>, fetcher: Arc<dyn Fetcher>) -> Self {
        let store = Arc::new(db.clone());
        Self { db, store, cache_name: cache_name.into(), precache, fetcher }
    }

    #[cfg(test)]
    pub(crate) fn with_store(mut self, store: Arc<dyn BucketStore>) -> Self {
        self.store = store;
        self
    }

    async fn precache_one(&self, url: &Url) -> Result<(Request, Response), Error> {
        let request = Request::get(url.clone(), Destination::Empty);
        let response = self
            .fetcher
            .fetch(&request)
            .await
            .map_err(|e| Error::PrecacheFailed { url: url.to_string(), reason: e.to_string() })?;

        if !response.ok() {
            return Err(Error::PrecacheFailed { url: url.to_string(), reason: format!("status {}", response.status) });
        }
        Ok((request, response))
    }

    /// Open the current bucket and store every manifest URL in it.
    ///
    /// All manifest entries are fetched concurrently and written in a single
    /// transaction; if any fetch fails nothing is written.
    ///
    /// # Errors
    ///
    /// Returns `PrecacheFailed` naming the first URL that failed, or the
    /// storage error if the batch could not be written.
    pub async fn install(&self) -> Result<InstallReport, Error> {
        let bucket = self.db.open_bucket(&self.cache_name).await?;

        let entries = try_join_all(self.precache.iter().map(|url| self.precache_one(url))).await?;
        let precached = bucket.put_all(entries).await?;

        tracing::info!(cache = %self.cache_name, precached, "precache complete");

        Ok(InstallReport { cache_name: self.cache_name.clone(), precached, skip_waiting: true })
    }

    /// Delete every bucket except the current one.
    ///
    /// Deletions run concurrently; each failure is logged and reported but
    /// never aborts the activation.
    pub async fn activate(&self) -> ActivateReport {
        let names = match self.store.bucket_names().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(error = %e, "could not enumerate cache buckets; skipping cleanup");
                Vec::new()
            }
        };

        let stale: Vec<String> = names.into_iter().filter(|name| *name != self.cache_name).collect();
        let results =
            join_all(stale.iter().map(|name| async move { (name, self.store.delete_bucket(name).await) })).await;

        let mut report = ActivateReport { cache_name: self.cache_name.clone(), ..Default::default() };
        for (name, result) in results {
            match result {
                Ok(_) => {
                    tracing::info!(cache = %name, "deleted stale cache");
                    report.deleted.push(name.clone());
                }
                Err(e) => {
                    tracing::warn!(cache = %name, error = %e, "failed to delete stale cache");
                    report.failed.push((name.clone(), e.to_string()));
                }
            }
        }

        report
    }
}
