//! Outbox for requests made while offline.
//!
//! Items are grouped by sync tag and replayed oldest-first when the host
//! fires a background sync for that tag.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// A queued request payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct OutboxItem {
    pub id: i64,
    pub tag: String,
    pub payload_json: String,
    pub queued_at: String,
}

impl CacheDb {
    /// Queue a payload under a sync tag. Returns the new item id.
    pub async fn enqueue(&self, tag: &str, payload_json: &str) -> Result<i64, Error> {
        let tag = tag.to_string();
        let payload_json = payload_json.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<i64, Error> {
                conn.execute(
                    "INSERT INTO outbox (tag, payload_json, queued_at) VALUES (?1, ?2, ?3)",
                    params![tag, payload_json, now],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(Error::from)
    }

    /// Items queued under `tag`, oldest first.
    pub async fn pending(&self, tag: &str) -> Result<Vec<OutboxItem>, Error> {
        let tag = tag.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<OutboxItem>, Error> {
                let mut stmt =
                    conn.prepare("SELECT id, tag, payload_json, queued_at FROM outbox WHERE tag = ?1 ORDER BY id")?;
                let items = stmt
                    .query_map(params![tag], |row| {
                        Ok(OutboxItem { id: row.get(0)?, tag: row.get(1)?, payload_json: row.get(2)?, queued_at: row.get(3)? })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(items)
            })
            .await
            .map_err(Error::from)
    }

    /// Remove a delivered item. Returns false if it was already gone.
    pub async fn remove_queued(&self, id: i64) -> Result<bool, Error> {
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM outbox WHERE id = ?1", params![id])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}
