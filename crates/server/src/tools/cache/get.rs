//! cache_get tool implementation.
//!
//! Looks up a request in the current bucket without touching the network.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tally_core::{Destination, Error, Request};

use crate::host::Host;
use crate::tools::{ResponseOutput, json_result, target_url};

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// URL of the stored request; paths resolve against the application origin.
    pub url: String,

    /// HTTP method (default: GET). Only GET requests are ever stored.
    #[serde(default)]
    pub method: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub bucket: String,
    pub request: String,
    /// The stored response.
    pub response: ResponseOutput,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(host: &Host, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = target_url(&host.origin, &params.url)?;
    let request = Request::new(params.method.as_deref().unwrap_or("GET"), url, Destination::Empty);

    let name = host.worker.read().await.cache_name().to_string();
    let response = host
        .db
        .bucket(&name)
        .match_request(&request)
        .await?
        .ok_or_else(|| Error::CacheMiss(request.identity()))?;

    json_result(&CacheGetOutput { bucket: name, request: request.identity(), response: ResponseOutput::from(&response) })
}
