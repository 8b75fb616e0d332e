//! tally-sw entry point.
//!
//! Boots the worker host as an MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tally_client::{FetchConfig, Fetcher, HttpFetcher, ServiceWorker, WorkerConfig};
use tally_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod handler;
mod host;
mod tools;

#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let worker_config = WorkerConfig::from_app(&config)?;

    let db = CacheDb::open(&config.db_path)
        .await
        .with_context(|| format!("opening cache database {}", config.db_path.display()))?
        .with_quota(config.quota_bytes);

    let fetcher = HttpFetcher::new(FetchConfig {
        origin: worker_config.origin.clone(),
        user_agent: config.user_agent.clone(),
        max_bytes: config.max_bytes,
        timeout: config.timeout(),
        ..FetchConfig::new(worker_config.origin.clone())
    })?;

    tracing::info!(
        origin = %worker_config.origin,
        cache = %worker_config.cache_name,
        precache = worker_config.precache.len(),
        "Starting tally-sw host on stdio transport"
    );

    let fetcher: Arc<dyn Fetcher> = Arc::new(fetcher);
    let worker = ServiceWorker::restore(worker_config, db.clone(), fetcher.clone())
        .await
        .context("restoring worker state")?;
    tracing::info!(state = %worker.state(), "worker ready");

    let host = host::Host::new(worker, db.clone(), fetcher);
    let server = serve_server(handler::TallyServer::new(Arc::new(host)), stdio()).await?;

    server.waiting().await?;
    db.close().await.context("closing cache database")?;

    Ok(())
}
