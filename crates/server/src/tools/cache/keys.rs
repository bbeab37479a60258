//! cache_keys tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use railbook_client::worker::CachePolicyEngine;
use railbook_core::{Error, StoredKey};

use crate::tools::json_result;

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// List this bucket's entries. Default: summarize every bucket.
    #[serde(default)]
    pub bucket: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BucketSummary {
    pub name: String,
    pub namespace: String,
    pub version: String,
    pub created_at: String,
    pub entries: usize,
    /// Whether activation would keep this bucket.
    pub current: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<StoredKey>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheKeysOutput {
    pub buckets: Vec<BucketSummary>,
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(engine: &CachePolicyEngine, params: CacheKeysParams) -> Result<CallToolResult, McpError> {
    let storage = engine.storage();
    let mut buckets = storage.buckets().await?;
    if let Some(name) = params.bucket.as_deref() {
        buckets.retain(|b| b.name == name);
        if buckets.is_empty() {
            return Err(Error::UnknownBucket(name.to_string()).into());
        }
    }

    let mut summaries = Vec::with_capacity(buckets.len());
    for info in buckets {
        let keys = storage.keys(&info.name).await?;
        summaries.push(BucketSummary {
            current: !engine.policy().is_stale(&info.generation),
            namespace: info.generation.namespace.clone(),
            version: info.generation.version.clone(),
            entries: keys.len(),
            keys: params.bucket.is_some().then_some(keys),
            name: info.name,
            created_at: info.created_at,
        });
    }

    Ok(json_result(&CacheKeysOutput { buckets: summaries })?)
}
