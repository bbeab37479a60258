//! cache_trim tool implementation.
//!
//! Runs the size bound on demand, oldest entries first.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use railbook_client::worker::CachePolicyEngine;

use crate::error::WorkerError;
use crate::tools::json_result;

/// Parameters for the cache_trim tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheTrimParams {
    /// Bucket to trim (default: the current runtime bucket).
    #[serde(default)]
    pub bucket: Option<String>,

    /// Keep at most this many entries (default: the configured runtime bound).
    #[serde(default)]
    pub max_entries: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheTrimOutput {
    pub bucket: String,
    pub deleted: usize,
    pub remaining: usize,
}

/// Implementation of the cache_trim tool.
pub async fn trim_impl(engine: &CachePolicyEngine, params: CacheTrimParams) -> Result<CallToolResult, McpError> {
    let policy = engine.policy();
    let bucket = params.bucket.unwrap_or_else(|| policy.runtime_generation.bucket_name());
    let max_entries = params.max_entries.unwrap_or(policy.max_runtime_entries);
    if max_entries == 0 {
        return Err(WorkerError::InvalidInput("max_entries must be greater than 0".into()).into());
    }

    let deleted = engine.enforce_size_bound(&bucket, max_entries).await?;
    let remaining = engine.storage().entry_count(&bucket).await?;

    Ok(json_result(&CacheTrimOutput { bucket, deleted, remaining })?)
}
