//! sw_install and sw_activate tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde::Serialize;

use railbook_client::worker::{ActivationReport, CachePolicyEngine, InstallReport, LifecycleState};

use super::json_result;

#[derive(Debug, Clone, Serialize)]
pub struct InstallOutput {
    pub state: LifecycleState,
    pub skip_waiting: bool,
    #[serde(flatten)]
    pub report: InstallReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivateOutput {
    pub state: LifecycleState,
    #[serde(flatten)]
    pub report: ActivationReport,
}

/// Populate the static bucket for the configured version.
pub async fn install_impl(engine: &CachePolicyEngine) -> Result<CallToolResult, McpError> {
    let report = engine.install().await?;
    let output = InstallOutput { state: engine.state().await, skip_waiting: engine.skip_waiting_requested(), report };
    Ok(json_result(&output)?)
}

/// Purge stale generations, claim pages, and announce the new version.
pub async fn activate_impl(engine: &CachePolicyEngine) -> Result<CallToolResult, McpError> {
    let report = engine.activate().await?;
    let output = ActivateOutput { state: engine.state().await, report };
    Ok(json_result(&output)?)
}
