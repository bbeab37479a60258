//! SQLite-backed storage for cache generations.
//!
//! This module provides the storage abstraction the policy engine runs on:
//!
//! - Named buckets, one per [`GenerationId`], kept in creation order
//! - Entries keyed by request identity (method + URL), kept in insertion order
//! - Overwriting a key moves it to the newest position
//! - Deleting a bucket removes its entries

pub mod buckets;
pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;

use async_trait::async_trait;

pub use crate::Error;
use crate::generation::GenerationId;
use crate::request::{CacheRequest, ResponseSnapshot};

pub use buckets::BucketInfo;
pub use connection::CacheDb;
pub use entries::StoredKey;

/// Asynchronous bucket store used by the policy engine.
///
/// Implementations guarantee that each `put` and `delete_*` is atomic;
/// no other coordination is offered or assumed.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open the bucket for a generation, creating it if absent.
    async fn open(&self, generation: &GenerationId) -> Result<BucketInfo, Error>;

    /// All buckets in creation order.
    async fn buckets(&self) -> Result<Vec<BucketInfo>, Error>;

    /// Delete a bucket and its entries. Returns false if it did not exist.
    async fn delete_bucket(&self, name: &str) -> Result<bool, Error>;

    /// Entry keys of a bucket, oldest first. Unknown buckets have no keys.
    async fn keys(&self, bucket: &str) -> Result<Vec<StoredKey>, Error>;

    /// Look up a request in one bucket.
    async fn match_in(&self, bucket: &str, request: &CacheRequest) -> Result<Option<ResponseSnapshot>, Error>;

    /// Look up a request across all buckets, oldest bucket first.
    async fn match_any(&self, request: &CacheRequest) -> Result<Option<ResponseSnapshot>, Error>;

    /// Store a response, replacing any previous entry for the same request.
    async fn put(&self, bucket: &str, request: &CacheRequest, response: &ResponseSnapshot) -> Result<(), Error>;

    /// Delete one entry by request key. Returns false if it did not exist.
    async fn delete_entry(&self, bucket: &str, request_key: &str) -> Result<bool, Error>;

    async fn bucket_names(&self) -> Result<Vec<String>, Error> {
        Ok(self.buckets().await?.into_iter().map(|b| b.name).collect())
    }

    async fn entry_count(&self, bucket: &str) -> Result<usize, Error> {
        Ok(self.keys(bucket).await?.len())
    }
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, generation: &GenerationId) -> Result<BucketInfo, Error> {
        self.open_bucket(generation).await
    }

    async fn buckets(&self) -> Result<Vec<BucketInfo>, Error> {
        self.list_buckets().await
    }

    async fn delete_bucket(&self, name: &str) -> Result<bool, Error> {
        self.remove_bucket(name).await
    }

    async fn keys(&self, bucket: &str) -> Result<Vec<StoredKey>, Error> {
        self.list_keys(bucket).await
    }

    async fn match_in(&self, bucket: &str, request: &CacheRequest) -> Result<Option<ResponseSnapshot>, Error> {
        self.get_entry(Some(bucket), &hash::request_key(request)).await
    }

    async fn match_any(&self, request: &CacheRequest) -> Result<Option<ResponseSnapshot>, Error> {
        self.get_entry(None, &hash::request_key(request)).await
    }

    async fn put(&self, bucket: &str, request: &CacheRequest, response: &ResponseSnapshot) -> Result<(), Error> {
        self.put_entry(bucket, request, response).await
    }

    async fn delete_entry(&self, bucket: &str, request_key: &str) -> Result<bool, Error> {
        self.remove_entry(bucket, request_key).await
    }
}
