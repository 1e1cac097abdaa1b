//! MCP server handler implementation.
//!
//! This module defines the host handler that exposes one [`OfflineAgent`]
//! and routes tool calls to the implementations in [`crate::tools`].
use std::sync::Arc;

use crate::tools::{
    AgentFetchParams, CacheGetParams, activate_impl, fetch_impl, get_impl, install_impl, list_impl,
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
use shellcache_client::OfflineAgent;

/// MCP host for the offline agent.
#[derive(Clone)]
pub struct ShellcacheHost {
    agent: Arc<OfflineAgent>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl ShellcacheHost {
    pub fn new(agent: Arc<OfflineAgent>) -> Self {
        Self { agent, tool_router: Self::tool_router() }
    }

    /// Fire the install event.
    #[tool(description = "Install the agent: precache the app shell into the current cache store.")]
    async fn agent_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.agent).await
    }

    /// Fire the activate event.
    #[tool(description = "Activate the agent: delete every cache store from older versions.")]
    async fn agent_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.agent).await
    }

    #[tool(
        description = "Send a request through the agent. Returns status, headers, body, where the response came from, and how the request was classified."
    )]
    async fn agent_fetch(&self, params: Parameters<AgentFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.agent, params.0).await
    }

    #[tool(description = "List cache stores and the URLs each one holds. The current version's store is marked.")]
    async fn cache_stores(&self) -> Result<CallToolResult, McpError> {
        list_impl(&self.agent).await
    }

    #[tool(description = "Look up a URL in the current cache store without touching the network.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        get_impl(&self.agent, params.0).await
    }
}

impl ServerHandler for ShellcacheHost {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "shellcache-host".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(format!(
                "Offline agent for cache version {}. Call agent_install, then agent_activate, then agent_fetch.",
                self.agent.config().cache_version
            )),
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
