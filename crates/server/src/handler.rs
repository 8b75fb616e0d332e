//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::host::Host;
use crate::tools::{
    CacheGetParams, CachePurgeParams, SwFetchParams, SwMessageParams, SwPushParams, SwSyncParams, cache, sw,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The MCP server handler for the tally worker host.
#[derive(Clone)]
pub struct TallyServer {
    host: Arc<Host>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl TallyServer {
    pub fn new(host: Arc<Host>) -> Self {
        Self { host, tool_router: Self::tool_router() }
    }

    #[tool(description = "Install the worker: precache the manifest into the current bucket. Activates immediately when the worker skips waiting.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        sw::install_impl(&self.host).await
    }

    #[tool(description = "Activate an installed worker: delete stale cache buckets and claim open clients.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        sw::activate_impl(&self.host).await
    }

    /// Deliver a fetch event.
    ///
    /// Before activation, and for cross-origin URLs, the request passes through to the network.
    #[tool(description = "Request a URL through the worker. Returns the response, the route taken, where the response came from, and what happened to the cache.")]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        sw::fetch_impl(&self.host, params.0).await
    }

    #[tool(description = "Post a message to the worker. {\"type\": \"SKIP_WAITING\"} activates a waiting worker.")]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        sw::message_impl(&self.host, params.0).await
    }

    #[tool(description = "Deliver a background sync event with the given tag.")]
    async fn sw_sync(&self, params: Parameters<SwSyncParams>) -> Result<CallToolResult, McpError> {
        sw::sync_impl(&self.host, params.0).await
    }

    #[tool(description = "Deliver a push event and return the notification it displays.")]
    async fn sw_push(&self, params: Parameters<SwPushParams>) -> Result<CallToolResult, McpError> {
        sw::push_impl(&self.host, params.0).await
    }

    #[tool(description = "Report the worker state and the cache buckets on disk.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        sw::status_impl(&self.host).await
    }

    #[tool(description = "Look up a request in the current cache bucket without using the network.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        cache::get_impl(&self.host, params.0).await
    }

    #[tool(description = "Delete a named cache bucket, or every bucket other than the current one.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        cache::purge_impl(&self.host, params.0).await
    }
}

impl ServerHandler for TallyServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "tally-sw".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
