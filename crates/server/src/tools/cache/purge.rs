//! cache_purge tool implementation.
//!
//! Deletes one named bucket, or every bucket the worker no longer serves from.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tally_core::Error;

use crate::host::Host;
use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Bucket to delete. When omitted, every non-current bucket is deleted.
    #[serde(default)]
    pub bucket: Option<String>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Names of the buckets deleted.
    pub deleted: Vec<String>,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(host: &Host, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    let targets = match params.bucket {
        Some(name) if name.trim().is_empty() => {
            return Err(Error::InvalidInput("bucket cannot be empty".to_string()).into());
        }
        Some(name) => vec![name],
        None => {
            let current = host.worker.read().await.cache_name().to_string();
            host.db
                .bucket_names()
                .await?
                .into_iter()
                .filter(|name| *name != current)
                .collect()
        }
    };

    let mut deleted = Vec::new();
    for name in targets {
        if host.db.delete_bucket(&name).await? {
            tracing::info!(cache = %name, "purged cache bucket");
            deleted.push(name);
        }
    }

    json_result(&CachePurgeOutput { deleted })
}
