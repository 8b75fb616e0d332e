//! sw_message, sw_sync and sw_push tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tally_client::worker::Notification;

use super::lifecycle::ActivateOutput;
use crate::host::{Host, activate_if_requested};
use crate::tools::json_result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message posted by the page, e.g. `{"type": "SKIP_WAITING"}`.
    pub data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageOutput {
    pub skip_waiting: bool,
    pub state: String,
    /// Present when the message let a waiting worker activate.
    pub activated: Option<ActivateOutput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncParams {
    /// Sync registration tag.
    pub tag: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncOutput {
    pub tag: String,
    pub recognized: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPushParams {
    /// Push payload text, normally JSON `{"title", "body", "primaryKey"?}`.
    #[serde(default)]
    pub payload: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPushOutput {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    /// `{dateOfArrival, primaryKey}`.
    pub data: Value,
}

impl SwPushOutput {
    fn from_notification(n: Notification) -> Result<Self, McpError> {
        let data = serde_json::to_value(&n.data)
            .map_err(|e| tally_core::Error::InvalidPayload(format!("notification data: {e}")))?;
        Ok(Self { title: n.title, body: n.body, icon: n.icon, badge: n.badge, vibrate: n.vibrate, data })
    }
}

/// Implementation of the sw_message tool.
pub async fn message_impl(host: &Host, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let mut worker = host.worker.write().await;
    let skip_waiting = worker.message(&params.data);
    let activated = activate_if_requested(&mut worker).await?;

    json_result(&SwMessageOutput {
        skip_waiting,
        state: worker.state().to_string(),
        activated: activated.map(ActivateOutput::from),
    })
}

/// Implementation of the sw_sync tool.
pub async fn sync_impl(host: &Host, params: SwSyncParams) -> Result<CallToolResult, McpError> {
    let outcome = host.worker.read().await.sync(&params.tag);
    json_result(&SwSyncOutput { tag: outcome.tag, recognized: outcome.recognized })
}

/// Implementation of the sw_push tool.
///
/// The notification is "displayed" by returning it to the caller.
pub async fn push_impl(host: &Host, params: SwPushParams) -> Result<CallToolResult, McpError> {
    let notification = host.worker.read().await.push(params.payload.as_deref())?;
    json_result(&SwPushOutput::from_notification(notification)?)
}
