//! sw_fetch tool implementation.
//!
//! Runs one request through the fetch policy and reports what the page would
//! receive.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use railbook_client::fetch::canonicalize;
use railbook_client::worker::{CachePolicyEngine, FetchOutcome, ResponseSource};
use railbook_core::{CacheRequest, Error, RequestMode, SkipReason};

use super::json_result;

/// Input parameters for sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path resolved against the worker's origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,

    /// Request mode (default: cors).
    #[serde(default)]
    pub mode: Option<RequestMode>,

    /// Optional Accept header.
    #[serde(default)]
    pub accept: Option<String>,
}

/// Output structure for sw_fetch tool.
#[derive(Debug, Clone, Serialize)]
pub struct SwFetchOutput {
    pub url: String,
    /// False when the worker left the request to the host.
    pub handled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ResponseSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Body text, when the body is valid UTF-8.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub body_bytes: usize,
}

pub async fn fetch_impl(engine: &CachePolicyEngine, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let url = canonicalize(&params.url, &engine.policy().origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let mut request = CacheRequest::get(url).with_mode(params.mode.unwrap_or_default());
    if let Some(method) = params.method.as_deref() {
        if method.trim().is_empty() {
            return Err(Error::InvalidInput("method cannot be empty".into()).into());
        }
        request = request.with_method(method.trim());
    }
    if let Some(accept) = params.accept {
        request = request.with_header("accept", accept);
    }

    let output = match engine.handle_fetch(&request).await {
        FetchOutcome::PassThrough(reason) => SwFetchOutput {
            url: request.url.to_string(),
            handled: false,
            skipped: Some(reason),
            source: None,
            status: None,
            status_text: None,
            headers: BTreeMap::new(),
            body: None,
            body_bytes: 0,
        },
        FetchOutcome::Respond { response, source } => SwFetchOutput {
            url: request.url.to_string(),
            handled: true,
            skipped: None,
            source: Some(source),
            status: Some(response.status),
            status_text: Some(response.status_text.clone()),
            body: std::str::from_utf8(&response.body).ok().map(str::to_string),
            body_bytes: response.body.len(),
            headers: response.headers,
        },
    };

    Ok(json_result(&output)?)
}
