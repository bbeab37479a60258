//! Bucket (generation) operations.

use super::connection::CacheDb;
use crate::Error;
use crate::generation::GenerationId;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored bucket and the generation it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct BucketInfo {
    pub name: String,
    pub generation: GenerationId,
    pub created_at: String,
}

fn row_to_bucket(row: &rusqlite::Row<'_>) -> rusqlite::Result<BucketInfo> {
    Ok(BucketInfo {
        name: row.get(0)?,
        generation: GenerationId { namespace: row.get(1)?, version: row.get(2)? },
        created_at: row.get(3)?,
    })
}

impl CacheDb {
    /// Create the bucket for a generation if absent and return it.
    ///
    /// Fails with `InvalidInput` when the rendered name is already taken by
    /// a different generation.
    pub async fn open_bucket(&self, generation: &GenerationId) -> Result<BucketInfo, Error> {
        let generation = generation.clone();
        let name = generation.bucket_name();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<BucketInfo, Error> {
                conn.execute(
                    "INSERT INTO buckets (name, namespace, version, created_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT DO NOTHING",
                    params![&name, &generation.namespace, &generation.version, &now],
                )?;

                let existing = conn.query_row(
                    "SELECT name, namespace, version, created_at FROM buckets WHERE name = ?1",
                    params![&name],
                    row_to_bucket,
                )?;

                if existing.generation != generation {
                    return Err(Error::InvalidInput(format!(
                        "bucket name {name} already belongs to {}/{}",
                        existing.generation.namespace, existing.generation.version
                    )));
                }
                Ok(existing)
            })
            .await
            .map_err(Error::from)
    }

    /// List all buckets in creation order.
    pub async fn list_buckets(&self) -> Result<Vec<BucketInfo>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<BucketInfo>, Error> {
                let mut stmt = conn.prepare("SELECT name, namespace, version, created_at FROM buckets ORDER BY seq ASC")?;
                let rows = stmt.query_map([], row_to_bucket)?;
                let mut buckets = Vec::new();
                for row in rows {
                    buckets.push(row?);
                }
                Ok(buckets)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a bucket; entries go with it via the foreign key cascade.
    pub async fn remove_bucket(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM buckets WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}
