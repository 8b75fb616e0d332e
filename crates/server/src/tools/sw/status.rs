//! sw_status tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::host::Host;
use crate::tools::json_result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BucketStatus {
    pub name: String,
    pub entries: u64,
    /// Whether this is the bucket the worker serves from.
    pub current: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwStatusOutput {
    /// `installing`, `waiting` or `active`.
    pub state: String,
    pub cache_name: String,
    pub controlling: bool,
    pub skip_waiting: bool,
    pub buckets: Vec<BucketStatus>,
    /// Bytes of response bodies stored across all buckets.
    pub usage_bytes: u64,
    pub quota_bytes: Option<u64>,
}

/// Implementation of the sw_status tool.
pub async fn status_impl(host: &Host) -> Result<CallToolResult, McpError> {
    let worker = host.worker.read().await;

    let mut buckets = Vec::new();
    for name in host.db.bucket_names().await? {
        let entries = host.db.bucket(&name).len().await?;
        let current = name == worker.cache_name();
        buckets.push(BucketStatus { name, entries, current });
    }

    json_result(&SwStatusOutput {
        state: worker.state().to_string(),
        cache_name: worker.cache_name().to_string(),
        controlling: worker.is_controlling(),
        skip_waiting: worker.skip_waiting_requested(),
        buckets,
        usage_bytes: host.db.usage_bytes().await?,
        quota_bytes: host.db.quota_bytes(),
    })
}
