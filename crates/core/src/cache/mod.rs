//! SQLite-backed partitioned response cache.
//!
//! This module provides named cache partitions holding response snapshots
//! keyed by request URL, using SQLite with async access via tokio-rusqlite.
//! It supports:
//!
//! - Named partitions created on demand and deleted wholesale
//! - Per-URL upserts (last write wins) and lookups across partitions
//! - A persistent outbox for requests replayed by background sync
//! - Automatic schema migrations and WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod outbox;
pub mod partitions;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CachedEntry;
pub use outbox::OutboxItem;
pub use partitions::PartitionInfo;
