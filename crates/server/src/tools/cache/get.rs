//! cache_get tool implementation.
//!
//! Looks a URL up in one partition, or across all of them.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::fetch::{parse_origin, resolve};
use shellcache_core::{CacheDb, Error};

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// URL of the cached response, absolute or relative to the origin.
    pub url: String,

    /// Partition to look in. All partitions are searched when omitted.
    #[serde(default)]
    pub partition: Option<String>,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub url: String,
    pub partition: Option<String>,
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
    pub stored_at: Option<String>,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(cache: &CacheDb, origin: &str, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let origin = parse_origin(origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let url = resolve(&origin, &params.url)
        .map_err(|e| Error::InvalidUrl(format!("{}: {e}", params.url)))?
        .to_string();

    let output = match params.partition {
        Some(partition) => {
            let entry = cache
                .get_entry(&partition, &url)
                .await?
                .ok_or_else(|| Error::CacheMiss(format!("{url} in {partition}")))?;
            CacheGetOutput {
                url,
                partition: Some(entry.partition),
                status: entry.response.status,
                body: String::from_utf8_lossy(&entry.response.body).into_owned(),
                headers: entry.response.headers,
                stored_at: Some(entry.stored_at),
            }
        }
        None => {
            let response = cache.match_any(&url).await?.ok_or_else(|| Error::CacheMiss(url.clone()))?;
            CacheGetOutput {
                url,
                partition: None,
                status: response.status,
                body: String::from_utf8_lossy(&response.body).into_owned(),
                headers: response.headers,
                stored_at: None,
            }
        }
    };

    json_result(&output)
}
