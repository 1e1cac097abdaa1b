//! agent_install and agent_activate tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde::Serialize;
use shellcache_client::{ActivateReport, InstallReport, LifecycleState, OfflineAgent};

use super::json_result;

/// Output from the agent_install tool.
#[derive(Debug, Clone, Serialize)]
pub struct AgentInstallOutput {
    #[serde(flatten)]
    pub report: InstallReport,
    pub state: LifecycleState,
}

/// Output from the agent_activate tool.
#[derive(Debug, Clone, Serialize)]
pub struct AgentActivateOutput {
    #[serde(flatten)]
    pub report: ActivateReport,
    pub state: LifecycleState,
}

/// Implementation of the agent_install tool.
pub async fn install_impl(agent: &OfflineAgent) -> Result<CallToolResult, McpError> {
    let report = agent.on_install().await?;
    json_result(&AgentInstallOutput { report, state: agent.state().await })
}

/// Implementation of the agent_activate tool.
pub async fn activate_impl(agent: &OfflineAgent) -> Result<CallToolResult, McpError> {
    let report = agent.on_activate().await?;
    json_result(&AgentActivateOutput { report, state: agent.state().await })
}
