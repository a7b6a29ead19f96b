//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting and clearing cache partitions.

pub mod get;
pub mod keys;
pub mod purge;

pub use get::{CacheGetParams, get_impl};
pub use keys::keys_impl;
pub use purge::{CachePurgeParams, purge_impl};
