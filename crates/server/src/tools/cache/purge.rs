//! cache_purge tool implementation.
//!
//! Deletes one bucket or every bucket, and acknowledges to pages.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use railbook_client::worker::{CachePolicyEngine, PurgeTarget};

use crate::error::WorkerError;
use crate::tools::json_result;

/// Parameters for the cache_purge tool. Exactly one of `bucket` or `all`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Name of the bucket to delete.
    #[serde(default)]
    pub bucket: Option<String>,

    /// Delete every bucket, including ones owned by other caches on the origin.
    #[serde(default)]
    pub all: bool,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(engine: &CachePolicyEngine, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    let target = match (params.bucket, params.all) {
        (Some(bucket), false) if !bucket.trim().is_empty() => PurgeTarget::Bucket(bucket),
        (None, true) => PurgeTarget::All,
        _ => return Err(WorkerError::InvalidInput("specify exactly one of bucket or all".into()).into()),
    };

    let report = engine.purge(target).await?;
    Ok(json_result(&report)?)
}
