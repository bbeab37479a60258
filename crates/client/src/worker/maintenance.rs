//! Explicit purge and size-bound enforcement.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use railbook_core::{CacheStorage, Error};

use super::CachePolicyEngine;
use super::messages::OutboundMessage;

/// What an explicit purge deletes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurgeTarget {
    All,
    Bucket(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurgeReport {
    pub deleted: Vec<String>,
    pub notified: usize,
}

/// Delete oldest entries of `bucket` until at most `max_entries` remain.
///
/// The key list is re-read before every deletion so entries written by
/// concurrent handlers are accounted for. The number of deletion attempts
/// is capped at the size first observed; anything left over is handled by
/// the next call. Returns how many entries were deleted.
pub async fn enforce_size_bound(storage: &dyn CacheStorage, bucket: &str, max_entries: usize) -> Result<usize, Error> {
    let mut deleted = 0;
    let mut attempts = 0;
    let mut budget = None;

    loop {
        let keys = storage.keys(bucket).await?;
        if keys.len() <= max_entries {
            break;
        }

        let budget = *budget.get_or_insert(keys.len());
        if attempts >= budget {
            tracing::warn!(bucket, entries = keys.len(), max_entries, "size bound not reached, deferring to next sweep");
            break;
        }
        attempts += 1;

        let oldest = &keys[0];
        if storage.delete_entry(bucket, &oldest.request_key).await? {
            tracing::debug!(bucket, url = %oldest.url, "evicted oldest entry");
            deleted += 1;
        }
    }

    if deleted > 0 {
        tracing::info!(bucket, deleted, max_entries, "cache trimmed");
    }
    Ok(deleted)
}

/// Shortest interval a sweep may run at.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// Run [`enforce_size_bound`] on a fixed interval.
///
/// The sweep uses its own storage handle and never touches engine state.
/// The first sweep runs one full `every` after spawning. Intervals below
/// [`MIN_SWEEP_INTERVAL`] are raised to it.
pub fn spawn_size_sweep(
    storage: Arc<dyn CacheStorage>, bucket: String, max_entries: usize, every: Duration,
) -> JoinHandle<()> {
    let every = if every < MIN_SWEEP_INTERVAL {
        tracing::warn!(requested = ?every, used = ?MIN_SWEEP_INTERVAL, "sweep interval too short, clamped");
        MIN_SWEEP_INTERVAL
    } else {
        every
    };
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = enforce_size_bound(storage.as_ref(), &bucket, max_entries).await {
                tracing::error!(bucket = %bucket, error = %e, "cache size sweep failed");
            }
        }
    })
}

impl CachePolicyEngine {
    /// Delete one or all buckets and acknowledge to every page.
    pub async fn purge(&self, target: PurgeTarget) -> Result<PurgeReport, Error> {
        let names = match &target {
            PurgeTarget::All => self.storage.bucket_names().await?,
            PurgeTarget::Bucket(name) => vec![name.clone()],
        };

        let mut deleted = Vec::new();
        for name in names {
            if self.storage.delete_bucket(&name).await? {
                tracing::info!(bucket = %name, "cache cleared");
                deleted.push(name);
            }
        }

        let notified = self.clients.broadcast(&OutboundMessage::CachesCleared).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to acknowledge cache purge");
            0
        });

        Ok(PurgeReport { deleted, notified })
    }

    pub async fn enforce_size_bound(&self, bucket: &str, max_entries: usize) -> Result<usize, Error> {
        enforce_size_bound(self.storage.as_ref(), bucket, max_entries).await
    }

    /// Trim the runtime bucket to the configured bound.
    pub async fn trim_runtime(&self) -> Result<usize, Error> {
        let bucket = self.policy.runtime_generation.bucket_name();
        self.enforce_size_bound(&bucket, self.policy.max_runtime_entries).await
    }
}
