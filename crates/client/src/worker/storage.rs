//! The cache seam between the worker and its storage.

use async_trait::async_trait;
use shellcache_core::{CacheDb, Error, OutboxItem, Response};

/// Partitioned response storage plus the sync outbox.
///
/// Implementations must make each `put` atomic per URL; `put_all` must be
/// all-or-nothing.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create `partition` if it does not exist.
    async fn open(&self, partition: &str) -> Result<(), Error>;

    /// Partition names in creation order.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a partition and its entries. False if it did not exist.
    async fn delete(&self, partition: &str) -> Result<bool, Error>;

    /// Look `url` up across all partitions.
    async fn match_any(&self, url: &str) -> Result<Option<Response>, Error>;

    async fn put(&self, partition: &str, url: &str, response: &Response) -> Result<(), Error>;

    async fn put_all(&self, partition: &str, entries: Vec<(String, Response)>) -> Result<(), Error>;

    async fn enqueue(&self, tag: &str, payload_json: &str) -> Result<i64, Error>;

    async fn pending(&self, tag: &str) -> Result<Vec<OutboxItem>, Error>;

    async fn remove_queued(&self, id: i64) -> Result<bool, Error>;
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, partition: &str) -> Result<(), Error> {
        self.open_partition(partition).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.partition_names().await
    }

    async fn delete(&self, partition: &str) -> Result<bool, Error> {
        self.delete_partition(partition).await
    }

    async fn match_any(&self, url: &str) -> Result<Option<Response>, Error> {
        CacheDb::match_any(self, url).await
    }

    async fn put(&self, partition: &str, url: &str, response: &Response) -> Result<(), Error> {
        self.put_entry(partition, url, response).await
    }

    async fn put_all(&self, partition: &str, entries: Vec<(String, Response)>) -> Result<(), Error> {
        self.put_entries(partition, entries).await
    }

    async fn enqueue(&self, tag: &str, payload_json: &str) -> Result<i64, Error> {
        CacheDb::enqueue(self, tag, payload_json).await
    }

    async fn pending(&self, tag: &str) -> Result<Vec<OutboxItem>, Error> {
        CacheDb::pending(self, tag).await
    }

    async fn remove_queued(&self, id: i64) -> Result<bool, Error> {
        CacheDb::remove_queued(self, id).await
    }
}
