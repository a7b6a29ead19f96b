//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::state::HostState;
use crate::tools::cache::{CachePurgeParams, CacheGetParams, get_impl, keys_impl, purge_impl};
use crate::tools::fetch::{SwFetchParams, fetch_impl};
use crate::tools::lifecycle::{
    ClientConnectParams, SwMessageParams, SwRegisterParams, connect_impl, message_impl, register_impl, status_impl,
};
use crate::tools::notify::{SwNotificationClickParams, SwPushParams, click_impl, push_impl};
use crate::tools::sync::{SwQueueParams, SwSyncParams, queue_impl, sync_impl};

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

/// The main MCP server handler for shellcache.
#[derive(Clone)]
pub struct ShellHost {
    tool_router: ToolRouter<Self>,
    state: Arc<HostState>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl ShellHost {
    /// Create a new server handler over shared host state.
    pub fn new(state: Arc<HostState>) -> Self {
        Self { tool_router: Self::tool_router(), state }
    }

    #[tool(description = "Install a worker version: pre-cache its manifest, then activate it or leave it waiting \
                          behind the active version. Returns the resulting state and page events.")]
    async fn sw_register(&self, params: Parameters<SwRegisterParams>) -> Result<CallToolResult, McpError> {
        register_impl(&self.state, params.0).await
    }

    #[tool(description = "Post a page message to the waiting worker, e.g. {\"type\":\"SKIP_WAITING\"}.")]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.state, params.0).await
    }

    #[tool(description = "Show active and waiting versions, connected pages, cache partitions and pending events.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.state).await
    }

    #[tool(description = "Connect a page. Pages connected while a version is active are controlled by it.")]
    async fn client_connect(&self, params: Parameters<ClientConnectParams>) -> Result<CallToolResult, McpError> {
        connect_impl(&self.state, params.0).await
    }

    /// Route a page request through the active worker.
    ///
    /// Static and image requests are served cache-first, API and other requests network-first,
    /// with offline fallbacks when both fail. Non-GET requests pass through to the network.
    #[tool(description = "Send a page request through the active worker. Returns the response and whether it came \
                          from cache, network, offline fallback or passthrough.")]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.state, params.0).await
    }

    #[tool(description = "Deliver a push message to the active worker and return the notification it shows.")]
    async fn sw_push(&self, params: Parameters<SwPushParams>) -> Result<CallToolResult, McpError> {
        push_impl(&self.state, params.0).await
    }

    #[tool(description = "Click a notification action (\"open\" or \"close\") and return what happens to the pages.")]
    async fn sw_notification_click(
        &self, params: Parameters<SwNotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        click_impl(&self.state, params.0).await
    }

    #[tool(description = "Queue a request for background sync under \"send-message\" or \"generate-image\".")]
    async fn sw_queue(&self, params: Parameters<SwQueueParams>) -> Result<CallToolResult, McpError> {
        queue_impl(&self.state, params.0).await
    }

    #[tool(description = "Replay queued requests for a sync tag, oldest first, stopping at the first failure.")]
    async fn sw_sync(&self, params: Parameters<SwSyncParams>) -> Result<CallToolResult, McpError> {
        sync_impl(&self.state, params.0).await
    }

    #[tool(description = "List cache partitions with their entry counts.")]
    async fn cache_keys(&self) -> Result<CallToolResult, McpError> {
        keys_impl(&self.state.db).await
    }

    #[tool(description = "Get a cached response by URL, from one partition or across all of them.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.state.db, &self.state.config.origin, params.0).await
    }

    #[tool(description = "Delete a cache partition, or every partition the active version does not own.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        let active = self.state.controller().await;
        purge_impl(&self.state.db, active.as_ref().map(|w| w.cache_names()), params.0).await
    }
}

impl ServerHandler for ShellHost {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "shellcache-mcp".into(),
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
