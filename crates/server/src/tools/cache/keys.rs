//! cache_keys tool implementation.
//!
//! Lists cache partitions with their entry counts.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_core::{CacheDb, PartitionInfo};

use crate::tools::json_result;

/// Output from the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    /// Partitions in creation order.
    pub partitions: Vec<PartitionInfo>,
}

/// Implementation of the cache_keys tool.
pub async fn keys_impl(cache: &CacheDb) -> Result<CallToolResult, McpError> {
    let partitions = cache.partition_info().await?;
    json_result(&CacheKeysOutput { partitions })
}
