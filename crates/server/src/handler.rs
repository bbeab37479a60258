//! MCP server handler implementation.
//!
//! This module defines the main server handler that routes tool calls to the
//! worker's lifecycle handlers.

use std::sync::Arc;

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

use railbook_client::worker::CachePolicyEngine;

use crate::host::Outbox;
use crate::tools::cache::{CacheGetParams, CacheKeysParams, CachePurgeParams, CacheTrimParams};
use crate::tools::events::{SwMessageParams, SwNotificationClickParams, SwPushParams, SwSyncParams};
use crate::tools::fetch::SwFetchParams;
use crate::tools::{cache, clients, events, fetch, lifecycle};

/// The main MCP server handler for railbook-sw.
#[derive(Clone)]
pub struct RailbookServer {
    tool_router: ToolRouter<Self>,
    engine: Arc<CachePolicyEngine>,
    outbox: Arc<Outbox>,
}

#[tool_router]
impl RailbookServer {
    pub fn new(engine: Arc<CachePolicyEngine>, outbox: Arc<Outbox>) -> Self {
        Self { tool_router: Self::tool_router(), engine, outbox }
    }

    #[tool(description = "Install the worker: cache every configured static asset into the current static bucket.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        lifecycle::install_impl(&self.engine).await
    }

    #[tool(description = "Activate the installed worker: delete stale cache generations, claim pages, announce the version.")]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        lifecycle::activate_impl(&self.engine).await
    }

    /// Intercept one request.
    ///
    /// Navigations go network first with cache fallback, static assets cache
    /// first with background refresh, data-backend calls network only.
    #[tool(
        description = "Intercept a request as the worker would. Returns the response the page receives and where it came from, or why the request was passed through."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch::fetch_impl(&self.engine, params.0).await
    }

    #[tool(description = "Post a page message to the worker: SKIP_WAITING, CLEAR_CACHE, CACHE_URLS{urls}, or CHECK_UPDATE.")]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        events::message_impl(&self.engine, params.0).await
    }

    #[tool(description = "Deliver a push message. JSON object payloads override notification fields; other text becomes the body.")]
    async fn sw_push(&self, params: Parameters<SwPushParams>) -> Result<CallToolResult, McpError> {
        events::push_impl(&self.engine, params.0).await
    }

    #[tool(description = "Click a shown notification, optionally on the view or dismiss action.")]
    async fn sw_notification_click(
        &self, params: Parameters<SwNotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        events::click_impl(&self.engine, params.0).await
    }

    #[tool(description = "Fire a background sync: sync-questions refreshes cached content, check-updates asks for a newer worker.")]
    async fn sw_sync(&self, params: Parameters<SwSyncParams>) -> Result<CallToolResult, McpError> {
        events::sync_impl(&self.engine, params.0).await
    }

    #[tool(description = "Retrieve a stored response by URL without using the network.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        cache::get_impl(&self.engine, params.0).await
    }

    #[tool(description = "List cache buckets with entry counts, or the entries of one bucket oldest first.")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        cache::keys_impl(&self.engine, params.0).await
    }

    #[tool(description = "Delete one cache bucket by name, or every bucket with all=true.")]
    async fn cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        cache::purge_impl(&self.engine, params.0).await
    }

    #[tool(description = "Trim a bucket to a maximum entry count, deleting the oldest entries first.")]
    async fn cache_trim(&self, params: Parameters<CacheTrimParams>) -> Result<CallToolResult, McpError> {
        cache::trim_impl(&self.engine, params.0).await
    }

    #[tool(description = "Drain messages, notifications, and window requests the worker sent since the last poll.")]
    async fn clients_poll(&self) -> Result<CallToolResult, McpError> {
        clients::poll_impl(&self.outbox).await
    }
}

impl ServerHandler for RailbookServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "railbook-sw".into(),
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
