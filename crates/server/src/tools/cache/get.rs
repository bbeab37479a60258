//! cache_get tool implementation.
//!
//! Retrieves a stored response by request URL, without touching the network.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use railbook_client::fetch::canonicalize;
use railbook_client::worker::CachePolicyEngine;
use railbook_core::{CacheRequest, Error};

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// Absolute URL, or a path resolved against the worker's origin.
    pub url: String,

    /// Search only this bucket. Default: every bucket, oldest first.
    #[serde(default)]
    pub bucket: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize)]
pub struct CacheGetOutput {
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    pub body_bytes: usize,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(engine: &CachePolicyEngine, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let url = canonicalize(&params.url, &engine.policy().origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let request = CacheRequest::get(url);

    let stored = match params.bucket.as_deref() {
        Some(bucket) => engine.storage().match_in(bucket, &request).await?,
        None => engine.storage().match_any(&request).await?,
    };
    let response = stored.ok_or_else(|| Error::CacheMiss(request.url.to_string()))?;

    let output = CacheGetOutput {
        url: request.url.to_string(),
        status: response.status,
        status_text: response.status_text,
        body_bytes: response.body.len(),
        headers: response.headers,
    };
    Ok(json_result(&output)?)
}
