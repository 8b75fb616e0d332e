//! sw_install and sw_activate tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tally_client::worker::ActivateReport;

use crate::host::{Host, activate_if_requested};
use crate::tools::json_result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ActivateOutput {
    pub cache_name: String,
    /// Stale buckets removed.
    pub deleted: Vec<String>,
    /// Stale buckets that could not be removed, with the reason.
    pub failed: Vec<(String, String)>,
    pub clients_claimed: bool,
}

impl From<ActivateReport> for ActivateOutput {
    fn from(report: ActivateReport) -> Self {
        Self {
            cache_name: report.cache_name,
            deleted: report.deleted,
            failed: report.failed,
            clients_claimed: report.clients_claimed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InstallOutput {
    pub cache_name: String,
    /// Number of manifest entries stored.
    pub precached: usize,
    pub skip_waiting: bool,
    /// Worker state after the call.
    pub state: String,
    /// Present when the worker was activated straight after installing.
    pub activated: Option<ActivateOutput>,
}

/// Implementation of the sw_install tool.
pub async fn install_impl(host: &Host) -> Result<CallToolResult, McpError> {
    let mut worker = host.worker.write().await;
    let report = worker.install().await?;
    let activated = activate_if_requested(&mut worker).await?;

    json_result(&InstallOutput {
        cache_name: report.cache_name,
        precached: report.precached,
        skip_waiting: report.skip_waiting,
        state: worker.state().to_string(),
        activated: activated.map(ActivateOutput::from),
    })
}

/// Implementation of the sw_activate tool.
pub async fn activate_impl(host: &Host) -> Result<CallToolResult, McpError> {
    let report = host.worker.write().await.activate().await?;
    json_result(&ActivateOutput::from(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CURRENT, host, output};

    #[tokio::test]
    async fn test_install_activates_immediately() {
        let (_fetcher, host) = host().await;
        host.db.open_bucket("expense-tracker-v1").await.unwrap();

        let result = install_impl(&host).await.unwrap();
        let out: InstallOutput = output(&result);

        assert_eq!(out.precached, 2);
        assert_eq!(out.state, "active");
        let activated = out.activated.unwrap();
        assert_eq!(activated.deleted, vec!["expense-tracker-v1".to_string()]);
        assert!(activated.clients_claimed);
        assert_eq!(host.db.bucket_names().await.unwrap(), vec![CURRENT.to_string()]);
    }

    #[tokio::test]
    async fn test_install_failure_reports_precache_error() {
        let (fetcher, host) = host().await;
        fetcher.forget("/a.css");

        let err = install_impl(&host).await.unwrap_err();
        assert_eq!(err.code.0, -32013);
        assert!(err.message.starts_with("PRECACHE_FAILED"));
        assert_eq!(host.worker.read().await.state().as_str(), "installing");
    }

    #[tokio::test]
    async fn test_activate_out_of_order() {
        let (_fetcher, host) = host().await;

        let err = activate_impl(&host).await.unwrap_err();
        assert_eq!(err.code.0, -32016);

        install_impl(&host).await.unwrap();
        let err = activate_impl(&host).await.unwrap_err();
        assert_eq!(err.message, "INVALID_STATE: activate while active");
    }
}
