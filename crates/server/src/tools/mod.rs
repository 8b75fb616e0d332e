//! MCP tool implementations.
//!
//! `sw_*` tools deliver events to the worker; `cache_*` tools inspect and
//! prune the bucket store directly.

pub mod cache;
pub mod sw;

pub use cache::{CacheGetParams, CachePurgeParams};
pub use sw::{SwFetchParams, SwMessageParams, SwPushParams, SwSyncParams};

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tally_core::{Error, Response};
use tally_client::fetch::{UrlError, resolve};
use url::Url;

/// A response as reported to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResponseOutput {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub status_text: String,
    /// `basic`, `cors`, `opaque` or `error`.
    pub response_type: String,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    pub body_bytes: usize,
}

impl From<&Response> for ResponseOutput {
    fn from(response: &Response) -> Self {
        Self {
            url: response.url.to_string(),
            status: response.status,
            status_text: response.status_text.clone(),
            response_type: response.response_type.as_str().to_string(),
            content_type: response.content_type().map(str::to_string),
            headers: response.headers.clone(),
            body: response.text(),
            body_bytes: response.body.len(),
        }
    }
}

/// Resolve a tool's `url` argument against the application origin.
pub(crate) fn target_url(origin: &Url, input: &str) -> Result<Url, Error> {
    resolve(origin, input).map_err(|e| match e {
        UrlError::Empty => Error::InvalidInput("url cannot be empty".into()),
        other => Error::InvalidUrl(other.to_string()),
    })
}

pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
