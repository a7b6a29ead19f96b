//! Notification tools: sw_push, sw_notification_click.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::worker::{ClientAction, ClientEvent, Notification};

use super::json_result;
use crate::state::HostState;

/// Parameters for the sw_push tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwPushParams {
    /// Push payload text. Empty or missing uses the default body.
    #[serde(default)]
    pub payload: Option<String>,
}

/// Parameters for the sw_notification_click tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwNotificationClickParams {
    /// Clicked action ("open" or "close"); missing means the body was clicked.
    #[serde(default)]
    pub action: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwPushOutput {
    #[serde(flatten)]
    pub notification: Notification,
    /// Page events raised since the last tool call, ending with this notification.
    pub events: Vec<ClientEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwNotificationClickOutput {
    pub action: ClientAction,
}

/// Implementation of the sw_push tool.
pub async fn push_impl(state: &HostState, params: SwPushParams) -> Result<CallToolResult, McpError> {
    let notification = state.registration.read().await.push(params.payload.as_deref())?;
    json_result(&SwPushOutput { notification, events: state.drain_events().await })
}

/// Implementation of the sw_notification_click tool.
pub async fn click_impl(state: &HostState, params: SwNotificationClickParams) -> Result<CallToolResult, McpError> {
    let action = state
        .registration
        .read()
        .await
        .notification_click(params.action.as_deref())?;
    json_result(&SwNotificationClickOutput { action })
}
