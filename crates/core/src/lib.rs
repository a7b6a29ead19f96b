//! Core types and shared functionality for shellcache.
//!
//! This crate provides:
//! - Partitioned response cache with SQLite backend
//! - Request/response message types
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{CacheDb, CachedEntry, OutboxItem, PartitionInfo};
pub use config::{AppConfig, ConfigError, NotificationConfig};
pub use error::Error;
pub use http::{Destination, Request, Response};
