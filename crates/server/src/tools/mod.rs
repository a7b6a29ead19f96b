//! MCP tool implementations.
//!
//! This module contains all tools exposed by the shellcache host. Every tool
//! answers with pretty-printed JSON in a single text content block.

pub mod cache;
pub mod fetch;
pub mod lifecycle;
pub mod notify;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use crate::error::ToolError;

pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| ToolError::Serialization(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}
