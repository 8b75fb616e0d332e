//! Network-First: documents and API calls.
//!
//! The network always wins while it answers. The cache is consulted only
//! after a network failure or when the deadline passes; any other error is
//! returned as is. Navigations then
//! fall back to the cached root page. API calls with no cached entry fail
//! with the original network error, so stale figures are never invented.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tally_core::{Bucket, Destination, Error, Request, Response};
use url::Url;

use super::{CacheWrite, ResponseSource, Strategy, StrategyOutcome, store};
use crate::fetch::Fetcher;

pub struct NetworkFirst {
    bucket: Bucket,
    fetcher: Arc<dyn Fetcher>,
    timeout: Duration,
    shell_url: Url,
}

impl NetworkFirst {
    /// `shell_url` is the page served to navigations that miss while offline.
    pub fn new(bucket: Bucket, fetcher: Arc<dyn Fetcher>, timeout: Duration, shell_url: Url) -> Self {
        Self { bucket, fetcher, timeout, shell_url }
    }

    async fn network(&self, request: &Request) -> Result<Response, Error> {
        match tokio::time::timeout(self.timeout, self.fetcher.fetch(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::FetchTimeout(format!(
                "{} gave no response within {}ms",
                request.url,
                self.timeout.as_millis()
            ))),
        }
    }

    /// Cache lookup during fallback; a storage error counts as a miss.
    fn lookup(&self, found: Result<Option<Response>, Error>) -> Option<Response> {
        found
            .inspect_err(|e| tracing::warn!(bucket = self.bucket.name(), error = %e, "cache read failed during fallback"))
            .ok()
            .flatten()
    }
}

#[async_trait]
impl Strategy for NetworkFirst {
    fn name(&self) -> &'static str {
        "network_first"
    }

    async fn handle(&self, request: &Request) -> Result<StrategyOutcome, Error> {
        let err = match self.network(request).await {
            Ok(response) => {
                let cache_write =
                    if response.status == 200 { store(&self.bucket, request, &response).await } else { CacheWrite::Skipped };
                return Ok(StrategyOutcome { response, source: ResponseSource::Network, cache_write });
            }
            Err(e) if e.is_network_failure() => e,
            Err(e) => return Err(e),
        };

        tracing::debug!("network failed for {}: {}; trying cache", request.url, err);

        if let Some(cached) = self.lookup(self.bucket.match_request(request).await) {
            return Ok(StrategyOutcome::from_cache(cached, ResponseSource::Cache));
        }

        if request.destination == Destination::Document
            && let Some(shell) = self.lookup(self.bucket.match_url(&self.shell_url).await)
        {
            tracing::debug!("serving offline shell {} for {}", self.shell_url, request.url);
            return Ok(StrategyOutcome::from_cache(shell, ResponseSource::OfflineShell));
        }

        Err(err)
    }
}
