//! Cache-First: static assets addressed by URL.

use std::sync::Arc;

use async_trait::async_trait;
use tally_core::{Bucket, Error, Request};

use super::{CacheWrite, ResponseSource, Strategy, StrategyOutcome, store};
use crate::fetch::Fetcher;

/// Serves from the bucket when possible; on a miss fetches and stores
/// `200 basic` responses. A failed cache read counts as a miss. Never evicts.
pub struct CacheFirst {
    bucket: Bucket,
    fetcher: Arc<dyn Fetcher>,
}

impl CacheFirst {
    pub fn new(bucket: Bucket, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { bucket, fetcher }
    }
}

#[async_trait]
impl Strategy for CacheFirst {
    fn name(&self) -> &'static str {
        "cache_first"
    }

    async fn handle(&self, request: &Request) -> Result<StrategyOutcome, Error> {
        match self.bucket.match_request(request).await {
            Ok(Some(cached)) => {
                tracing::debug!("cache hit for {}", request.url);
                return Ok(StrategyOutcome::from_cache(cached, ResponseSource::Cache));
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(bucket = self.bucket.name(), error = %e, "cache read failed; fetching {}", request.url);
            }
        }

        let response = self.fetcher.fetch(request).await?;

        let cache_write = if response.is_basic_ok() {
            store(&self.bucket, request, &response).await
        } else {
            CacheWrite::Skipped
        };

        Ok(StrategyOutcome { response, source: ResponseSource::Network, cache_write })
    }
}
