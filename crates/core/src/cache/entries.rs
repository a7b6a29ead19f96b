//! Cached response entries.
//!
//! Entries map a request URL to a response snapshot inside one partition.
//! Writes are upserts, so concurrent writers of the same URL resolve to the
//! last write.

use std::collections::BTreeMap;

use super::connection::CacheDb;
use super::hash::compute_entry_key;
use crate::{Error, Response};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};

/// A stored response with its cache metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEntry {
    pub key_hash: String,
    pub partition: String,
    pub url: String,
    pub response: Response,
    pub stored_at: String,
}

const UPSERT_ENTRY: &str = "INSERT INTO entries (key_hash, partition, url, status, headers_json, body, stored_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(key_hash) DO UPDATE SET
        status = excluded.status,
        headers_json = excluded.headers_json,
        body = excluded.body,
        stored_at = excluded.stored_at";

const ENSURE_PARTITION: &str = "INSERT OR IGNORE INTO partitions (name, created_at) VALUES (?1, ?2)";

/// Column tuple as read from `entries`, before header/status decoding.
type RawEntry = (String, String, String, i64, String, Vec<u8>, String);

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEntry> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?, row.get(6)?))
}

fn decode_entry(raw: RawEntry) -> Result<CachedEntry, Error> {
    let (key_hash, partition, url, status, headers_json, body, stored_at) = raw;
    let headers: BTreeMap<String, String> = serde_json::from_str(&headers_json)?;
    let status = u16::try_from(status).map_err(|_| Error::CorruptEntry(format!("status {status} out of range")))?;
    Ok(CachedEntry { key_hash, partition, url, response: Response { status, headers, body }, stored_at })
}

impl CacheDb {
    /// Store a response under `url` in `partition`, creating the partition
    /// if needed.
    pub async fn put_entry(&self, partition: &str, url: &str, response: &Response) -> Result<(), Error> {
        self.put_entries(partition, vec![(url.to_string(), response.clone())]).await
    }

    /// Store several responses in one transaction: either all land or none.
    pub async fn put_entries(&self, partition: &str, entries: Vec<(String, Response)>) -> Result<(), Error> {
        let partition = partition.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(ENSURE_PARTITION, params![partition, now])?;
                for (url, response) in &entries {
                    let headers_json = serde_json::to_string(&response.headers)?;
                    tx.execute(
                        UPSERT_ENTRY,
                        params![
                            compute_entry_key(&partition, url),
                            partition,
                            url,
                            response.status as i64,
                            headers_json,
                            response.body,
                            now,
                        ],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get the full entry for `url` in `partition`.
    pub async fn get_entry(&self, partition: &str, url: &str) -> Result<Option<CachedEntry>, Error> {
        let key_hash = compute_entry_key(partition, url);
        self.conn
            .call(move |conn| -> Result<Option<CachedEntry>, Error> {
                let result = conn.query_row(
                    "SELECT key_hash, partition, url, status, headers_json, body, stored_at
                     FROM entries WHERE key_hash = ?1",
                    params![key_hash],
                    row_to_entry,
                );

                match result {
                    Ok(raw) => decode_entry(raw).map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Look up `url` in one partition.
    pub async fn match_entry(&self, partition: &str, url: &str) -> Result<Option<Response>, Error> {
        Ok(self.get_entry(partition, url).await?.map(|e| e.response))
    }

    /// Look up `url` across every partition, oldest partition first.
    pub async fn match_any(&self, url: &str) -> Result<Option<Response>, Error> {
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let result = conn.query_row(
                    "SELECT e.key_hash, e.partition, e.url, e.status, e.headers_json, e.body, e.stored_at
                     FROM entries e JOIN partitions p ON p.name = e.partition
                     WHERE e.url = ?1
                     ORDER BY p.rowid
                     LIMIT 1",
                    params![url],
                    row_to_entry,
                );

                match result {
                    Ok(raw) => decode_entry(raw).map(|e| Some(e.response)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// URLs stored in a partition, in insertion order.
    pub async fn entry_urls(&self, partition: &str) -> Result<Vec<String>, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE partition = ?1 ORDER BY rowid")?;
                let urls = stmt
                    .query_map(params![partition], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }
}
