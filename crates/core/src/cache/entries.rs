//! Entry operations: store, match, list, and delete cached responses.

use std::collections::BTreeMap;

use super::connection::CacheDb;
use super::hash::request_key;
use crate::Error;
use crate::request::{CacheRequest, ResponseSnapshot};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

/// Identity of one stored entry, as listed by `keys()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoredKey {
    pub request_key: String,
    pub method: String,
    pub url: String,
    pub stored_at: String,
}

struct EntryRow {
    status: i64,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
}

impl TryFrom<EntryRow> for ResponseSnapshot {
    type Error = Error;

    fn try_from(row: EntryRow) -> Result<Self, Error> {
        let status = u16::try_from(row.status).map_err(|_| Error::CorruptEntry(format!("status {}", row.status)))?;
        let headers: BTreeMap<String, String> =
            serde_json::from_str(&row.headers_json).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        Ok(ResponseSnapshot { status, status_text: row.status_text, headers, body: Bytes::from(row.body) })
    }
}

impl CacheDb {
    /// Store a response under the request identity.
    ///
    /// An existing entry for the same request is replaced and the new row
    /// takes the newest insertion position.
    pub async fn put_entry(
        &self, bucket: &str, request: &CacheRequest, response: &ResponseSnapshot,
    ) -> Result<(), Error> {
        let bucket = bucket.to_string();
        let key = request_key(request);
        let method = request.method.clone();
        let url = request.identity_url();
        let status = i64::from(response.status);
        let status_text = response.status_text.clone();
        let headers_json =
            serde_json::to_string(&response.headers).map_err(|e| Error::InvalidInput(e.to_string()))?;
        let body = response.body.to_vec();
        let stored_at = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                let known: bool =
                    tx.query_row("SELECT EXISTS(SELECT 1 FROM buckets WHERE name = ?1)", params![&bucket], |row| {
                        row.get(0)
                    })?;
                if !known {
                    return Err(Error::UnknownBucket(bucket));
                }
                tx.execute("DELETE FROM entries WHERE bucket = ?1 AND request_key = ?2", params![&bucket, &key])?;
                tx.execute(
                    "INSERT INTO entries (
                        bucket, request_key, method, url, status, status_text, headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![&bucket, &key, &method, &url, status, &status_text, &headers_json, &body, &stored_at],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get a stored response by request key.
    ///
    /// With `bucket = None` every bucket is searched, oldest bucket first.
    pub async fn get_entry(&self, bucket: Option<&str>, key: &str) -> Result<Option<ResponseSnapshot>, Error> {
        let bucket = bucket.map(str::to_string);
        let key = key.to_string();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let map_row = |row: &rusqlite::Row<'_>| {
                    Ok(EntryRow { status: row.get(0)?, status_text: row.get(1)?, headers_json: row.get(2)?, body: row.get(3)? })
                };
                let row = match bucket {
                    Some(bucket) => conn
                        .query_row(
                            "SELECT status, status_text, headers_json, body FROM entries
                             WHERE bucket = ?1 AND request_key = ?2",
                            params![bucket, key],
                            map_row,
                        )
                        .optional()?,
                    None => conn
                        .query_row(
                            "SELECT e.status, e.status_text, e.headers_json, e.body
                             FROM entries e JOIN buckets b ON b.name = e.bucket
                             WHERE e.request_key = ?1
                             ORDER BY b.seq ASC LIMIT 1",
                            params![key],
                            map_row,
                        )
                        .optional()?,
                };
                Ok(row)
            })
            .await
            .map_err(Error::from)?;

        row.map(ResponseSnapshot::try_from).transpose()
    }

    /// List entry keys of a bucket, oldest first.
    pub async fn list_keys(&self, bucket: &str) -> Result<Vec<StoredKey>, Error> {
        let bucket = bucket.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<StoredKey>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT request_key, method, url, stored_at FROM entries WHERE bucket = ?1 ORDER BY seq ASC",
                )?;
                let rows = stmt.query_map(params![bucket], |row| {
                    Ok(StoredKey { request_key: row.get(0)?, method: row.get(1)?, url: row.get(2)?, stored_at: row.get(3)? })
                })?;
                let mut keys = Vec::new();
                for row in rows {
                    keys.push(row?);
                }
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete one entry. Returns false if it did not exist.
    pub async fn remove_entry(&self, bucket: &str, key: &str) -> Result<bool, Error> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted =
                    conn.execute("DELETE FROM entries WHERE bucket = ?1 AND request_key = ?2", params![bucket, key])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}
