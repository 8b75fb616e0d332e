//! sw_fetch tool implementation.
//!
//! Delivers a fetch event to the worker. Requests the worker declines to
//! intercept are performed directly, the way a page would without a worker.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tally_client::FetchOutcome;
use tally_client::worker::CacheWrite;
use tally_core::{Destination, Error, Request};

use crate::host::Host;
use crate::tools::{ResponseOutput, json_result, target_url};

/// Input parameters for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// URL to request; paths resolve against the application origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request destination: "document", "image", "style", "script", "font",
    /// "manifest", or empty for API calls.
    #[serde(default)]
    pub destination: Option<String>,

    /// Request headers as `[name, value]` pairs.
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// The request identity, `METHOD url`.
    pub request: String,
    /// `passthrough`, `cache_first` or `network_first`.
    pub route: String,
    /// `cache`, `network`, `offline_shell`, or `passthrough`.
    pub source: String,
    /// `stored`, `skipped` or `failed`.
    pub cache_write: String,
    pub cache_error: Option<String>,
    pub response: ResponseOutput,
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(host: &Host, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let url = target_url(&host.origin, &params.url)?;
    let destination = Destination::parse(params.destination.as_deref().unwrap_or(""));
    let mut request = Request::new(&params.method, url, destination);
    for (name, value) in &params.headers {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("header name cannot be empty".into()).into());
        }
        request = request.with_header(name.trim(), value);
    }

    let outcome = host.worker.read().await.fetch(&request).await?;

    let output = match outcome {
        FetchOutcome::Passthrough => {
            let response = host.fetcher.fetch(&request).await?;
            SwFetchOutput {
                request: request.identity(),
                route: "passthrough".into(),
                source: "passthrough".into(),
                cache_write: "skipped".into(),
                cache_error: None,
                response: ResponseOutput::from(&response),
            }
        }
        FetchOutcome::Handled { route, outcome } => {
            let (cache_write, cache_error) = match outcome.cache_write {
                CacheWrite::Stored => ("stored", None),
                CacheWrite::Skipped => ("skipped", None),
                CacheWrite::Failed(reason) => ("failed", Some(reason)),
            };
            SwFetchOutput {
                request: request.identity(),
                route: route.as_str().into(),
                source: outcome.source.as_str().into(),
                cache_write: cache_write.into(),
                cache_error,
                response: ResponseOutput::from(&outcome.response),
            }
        }
    };

    json_result(&output)
}
