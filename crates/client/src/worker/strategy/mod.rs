//! Strategy executors.
//!
//! Each executor answers one intercepted request from the current bucket, the
//! network, or both, and reports where the answer came from and what happened
//! to the cache write. Cache writes are best effort: a failed write is logged
//! and reported, never returned as an error.

pub mod cache_first;
pub mod network_first;

pub use cache_first::CacheFirst;
pub use network_first::NetworkFirst;

use async_trait::async_trait;
use tally_core::{Bucket, Error, Request, Response};

/// Where a strategy's response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
    /// Cached root page served for an offline navigation.
    OfflineShell,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Cache => "cache",
            ResponseSource::Network => "network",
            ResponseSource::OfflineShell => "offline_shell",
        }
    }
}

/// What happened to the cache while answering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheWrite {
    Stored,
    /// Response was not eligible, or came from the cache.
    Skipped,
    Failed(String),
}

/// Result of running a strategy.
#[derive(Debug, Clone)]
pub struct StrategyOutcome {
    pub response: Response,
    pub source: ResponseSource,
    pub cache_write: CacheWrite,
}

impl StrategyOutcome {
    pub(crate) fn from_cache(response: Response, source: ResponseSource) -> Self {
        Self { response, source, cache_write: CacheWrite::Skipped }
    }
}

/// A caching strategy for intercepted requests.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Answer the request, or return the network failure when nothing can stand in for it.
    async fn handle(&self, request: &Request) -> Result<StrategyOutcome, Error>;
}

/// Store a copy of `response` for `request`, swallowing failures.
pub(crate) async fn store(bucket: &Bucket, request: &Request, response: &Response) -> CacheWrite {
    match bucket.put(request, response).await {
        Ok(()) => CacheWrite::Stored,
        Err(e) => {
            tracing::warn!(
                bucket = bucket.name(),
                request = %request.identity(),
                error = %e,
                "cache write failed; serving live response"
            );
            CacheWrite::Failed(e.to_string())
        }
    }
}
