//! cache_stores tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde::Serialize;
use shellcache_client::OfflineAgent;

use crate::tools::json_result;

/// One cache store and the URLs it holds.
#[derive(Debug, Clone, Serialize)]
pub struct StoreSummary {
    pub name: String,
    /// True for the store owned by the running cache version.
    pub current: bool,
    pub urls: Vec<String>,
}

/// Output from the cache_stores tool.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStoresOutput {
    pub cache_version: String,
    pub stores: Vec<StoreSummary>,
}

/// Implementation of the cache_stores tool.
pub async fn list_impl(agent: &OfflineAgent) -> Result<CallToolResult, McpError> {
    let storage = agent.storage();
    let version = &agent.config().cache_version;

    let mut stores = Vec::new();
    for name in storage.keys().await? {
        let urls = storage.requests(&name).await?;
        let current = name == *version;
        stores.push(StoreSummary { name, current, urls });
    }

    json_result(&CacheStoresOutput { cache_version: version.clone(), stores })
}
