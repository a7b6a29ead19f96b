//! cache_purge tool implementation.
//!
//! Deletes one named partition, or every partition the active version does
//! not own.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::worker::CacheNames;
use shellcache_core::{CacheDb, Error};

use crate::error::ToolError;
use crate::tools::json_result;

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Delete this partition and all its entries.
    #[serde(default)]
    pub partition: Option<String>,

    /// Delete every partition not owned by the active version.
    #[serde(default)]
    pub stale: bool,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    /// Names of the deleted partitions.
    pub deleted: Vec<String>,
}

/// Implementation of the cache_purge tool.
///
/// `active` names the partitions of the active version; required for a
/// stale purge.
pub async fn purge_impl(
    cache: &CacheDb, active: Option<&CacheNames>, params: CachePurgeParams,
) -> Result<CallToolResult, McpError> {
    if params.partition.is_none() && !params.stale {
        return Err(ToolError::InvalidInput("At least one of partition or stale must be specified".to_string()).into());
    }

    let mut deleted = Vec::new();

    if let Some(partition) = params.partition
        && cache.delete_partition(&partition).await?
    {
        deleted.push(partition);
    }

    if params.stale {
        let names = active.ok_or_else(|| Error::InvalidState("no active worker".into()))?;
        for name in cache.partition_names().await? {
            if !names.owns(&name) && cache.delete_partition(&name).await? {
                deleted.push(name);
            }
        }
    }

    tracing::info!(deleted = deleted.len(), "purged partitions");
    json_result(&CachePurgeOutput { deleted })
}
