//! Background sync tools: sw_queue, sw_sync.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::WorkerHandlers;
use shellcache_core::Error;

use super::json_result;
use crate::state::HostState;

/// Parameters for the sw_queue tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwQueueParams {
    /// Sync tag: "send-message" or "generate-image".
    pub tag: String,

    /// JSON body to POST when the tag is synced.
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwQueueOutput {
    pub id: i64,
    pub tag: String,
    /// Items queued under this tag, including this one.
    pub pending: usize,
}

/// Parameters for the sw_sync tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwSyncParams {
    pub tag: String,
}

/// Implementation of the sw_queue tool.
pub async fn queue_impl(state: &HostState, params: SwQueueParams) -> Result<CallToolResult, McpError> {
    let worker = state
        .controller()
        .await
        .ok_or_else(|| Error::InvalidState("no active worker".into()))?;

    let id = worker.queue(&params.tag, &params.payload).await?;
    let pending = state.db.pending(&params.tag).await?.len();

    json_result(&SwQueueOutput { id, tag: params.tag, pending })
}

/// Implementation of the sw_sync tool.
pub async fn sync_impl(state: &HostState, params: SwSyncParams) -> Result<CallToolResult, McpError> {
    let worker = state
        .controller()
        .await
        .ok_or_else(|| Error::InvalidState("no active worker".into()))?;

    let report = worker.on_sync(&params.tag).await;
    json_result(&report)
}
