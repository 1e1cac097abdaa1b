//! MCP tool implementations.
//!
//! Each tool drives the shared [`OfflineAgent`](shellcache_client::OfflineAgent)
//! and answers with pretty-printed JSON.

pub mod cache;
pub mod fetch;
pub mod lifecycle;

#[cfg(test)]
pub(crate) mod testing;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;
use shellcache_core::Error;

pub use cache::{CacheGetParams, get_impl, list_impl};
pub use fetch::{AgentFetchParams, fetch_impl};
pub use lifecycle::{activate_impl, install_impl};

/// Serialize `output` into a successful tool result.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(Error::from)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
