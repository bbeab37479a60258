//! Page message, push, notification-click, and sync tools.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use railbook_client::worker::{CachePolicyEngine, InboundMessage};

use super::json_result;
use crate::error::WorkerError;

/// A message posted by a page.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// SKIP_WAITING, CLEAR_CACHE, CACHE_URLS, or CHECK_UPDATE
    /// (legacy clearCache and fetchFresh are accepted too).
    #[serde(rename = "type")]
    pub kind: String,

    /// Paths to cache for CACHE_URLS. Empty means the install list.
    #[serde(default)]
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwPushParams {
    /// Raw push payload: a JSON object overriding notification fields, or plain text.
    #[serde(default)]
    pub payload: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwNotificationClickParams {
    /// The clicked action ("view" or "dismiss"); omitted for a click on the body.
    #[serde(default)]
    pub action: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncParams {
    pub tag: String,

    /// Whether this is a periodic sync registration.
    #[serde(default)]
    pub periodic: bool,
}

pub async fn message_impl(engine: &CachePolicyEngine, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let mut raw = serde_json::json!({ "type": params.kind });
    if !params.urls.is_empty() {
        raw["urls"] = serde_json::json!(params.urls);
    }
    let message: InboundMessage =
        serde_json::from_value(raw).map_err(|_| WorkerError::UnknownMessage(params.kind.clone()))?;

    let reply = engine.handle_message(message).await?;
    Ok(json_result(&reply)?)
}

pub async fn push_impl(engine: &CachePolicyEngine, params: SwPushParams) -> Result<CallToolResult, McpError> {
    let notification = engine.handle_push(params.payload.as_deref().map(str::as_bytes)).await?;
    Ok(json_result(&notification)?)
}

pub async fn click_impl(
    engine: &CachePolicyEngine, params: SwNotificationClickParams,
) -> Result<CallToolResult, McpError> {
    let outcome = engine.handle_notification_click(params.action.as_deref()).await?;
    Ok(json_result(&outcome)?)
}

pub async fn sync_impl(engine: &CachePolicyEngine, params: SwSyncParams) -> Result<CallToolResult, McpError> {
    if params.tag.trim().is_empty() {
        return Err(WorkerError::InvalidInput("tag cannot be empty".into()).into());
    }
    let outcome = engine.handle_sync(&params.tag, params.periodic).await?;
    Ok(json_result(&outcome)?)
}
