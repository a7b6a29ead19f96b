//! Worker lifecycle tools: sw_register, sw_message, sw_status, client_connect.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::worker::{ClientEvent, ClientInfo, ClientMessage, RegistrationStatus, WorkerState};
use shellcache_core::PartitionInfo;

use super::json_result;
use crate::error::ToolError;
use crate::state::HostState;

/// Parameters for the sw_register tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwRegisterParams {
    /// Version to install. Defaults to the configured version.
    #[serde(default)]
    pub version: Option<String>,

    /// Files to pre-cache, replacing the configured shell files.
    #[serde(default)]
    pub manifest: Option<Vec<String>>,

    /// Activate immediately even when another version is active.
    #[serde(default)]
    pub auto_skip_waiting: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwRegisterOutput {
    pub version: String,
    pub state: WorkerState,
    pub events: Vec<ClientEvent>,
}

/// Parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// Message type, e.g. "SKIP_WAITING".
    #[serde(rename = "type")]
    pub message_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwMessageOutput {
    /// True if a waiting version took over.
    pub activated: bool,
    pub status: RegistrationStatus,
    pub events: Vec<ClientEvent>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwStatusOutput {
    #[serde(flatten)]
    pub registration: RegistrationStatus,
    pub partitions: Vec<PartitionInfo>,
    pub events: Vec<ClientEvent>,
}

/// Parameters for the client_connect tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClientConnectParams {
    /// Identifier of the page.
    pub client_id: String,
}

fn check_version(version: &str) -> Result<(), ToolError> {
    if version.is_empty() || version.chars().any(char::is_whitespace) {
        return Err(ToolError::InvalidInput(format!("invalid version: {version:?}")));
    }
    Ok(())
}

/// Implementation of the sw_register tool.
pub async fn register_impl(state: &HostState, params: SwRegisterParams) -> Result<CallToolResult, McpError> {
    let mut config = state.worker_config();

    if let Some(version) = params.version {
        check_version(&version)?;
        config = config.with_version(version);
    }
    if let Some(manifest) = params.manifest {
        if manifest.is_empty() {
            return Err(ToolError::InvalidInput("manifest cannot be empty".into()).into());
        }
        config.rules.shell_files = manifest.clone();
        config.manifest = manifest;
    }
    if let Some(auto) = params.auto_skip_waiting {
        config.auto_skip_waiting = auto;
    }

    let version = config.version.clone();
    let worker = state.build_worker(config)?;
    let registered = state.register(worker).await;
    let events = state.drain_events().await;

    json_result(&SwRegisterOutput { version, state: registered?, events })
}

/// Implementation of the sw_message tool.
pub async fn message_impl(state: &HostState, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let message: ClientMessage = serde_json::from_value(serde_json::json!({ "type": &params.message_type }))
        .map_err(|_| ToolError::InvalidInput(format!("unknown message type: {}", params.message_type)))?;

    let mut registration = state.registration.write().await;
    let activated = registration.post_message(message).await;
    let status = registration.status();
    drop(registration);

    json_result(&SwMessageOutput { activated, status, events: state.drain_events().await })
}

/// Implementation of the sw_status tool.
pub async fn status_impl(state: &HostState) -> Result<CallToolResult, McpError> {
    let registration = state.registration.read().await.status();
    let partitions = state.db.partition_info().await?;

    json_result(&SwStatusOutput { registration, partitions, events: state.drain_events().await })
}

/// Implementation of the client_connect tool.
pub async fn connect_impl(state: &HostState, params: ClientConnectParams) -> Result<CallToolResult, McpError> {
    let id = params.client_id.trim();
    if id.is_empty() {
        return Err(ToolError::InvalidInput("client_id cannot be empty".into()).into());
    }

    let client: ClientInfo = state.registration.write().await.connect_client(id);
    json_result(&client)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::tools::fetch::{SwFetchParams, fetch_impl};
    use crate::tools::testing::{host, output, url};
    use shellcache_core::Response;

    #[tokio::test]
    async fn test_register_default_version() {
        let (state, _network) = host().await;

        let result = register_impl(&state, SwRegisterParams::default()).await.unwrap();

        let out = output(&result);
        assert_eq!(out["version"], "v1");
        assert_eq!(out["state"], "activated");
        assert!(state.db.has_partition("jarvis-static-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_register_update_then_skip_waiting() {
        let (state, _network) = host().await;
        register_impl(&state, SwRegisterParams::default()).await.unwrap();
        connect_impl(&state, ClientConnectParams { client_id: "page-1".into() }).await.unwrap();

        let params = SwRegisterParams { version: Some("v2".into()), ..Default::default() };
        let out = output(&register_impl(&state, params).await.unwrap());
        assert_eq!(out["state"], "installed");
        assert_eq!(out["events"][0]["type"], "update_available");
        assert_eq!(out["events"][0]["version"], "v2");

        let result = message_impl(&state, SwMessageParams { message_type: "SKIP_WAITING".into() }).await.unwrap();
        let out = output(&result);
        assert_eq!(out["activated"], true);
        assert_eq!(out["status"]["active"]["version"], "v2");
        assert_eq!(out["events"][0]["type"], "controller_change");
        assert!(!state.db.has_partition("jarvis-static-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_register_failure_is_error() {
        let (state, _network) = host().await;
        register_impl(&state, SwRegisterParams::default()).await.unwrap();

        let params = SwRegisterParams {
            version: Some("v2".into()),
            manifest: Some(vec!["/index.html".into(), "/missing.css".into()]),
            ..Default::default()
        };
        let err = register_impl(&state, params).await.unwrap_err();

        assert_eq!(err.code, rmcp::model::ErrorCode(-32020));
        assert_eq!(state.controller().await.unwrap().version(), "v1");
    }

    #[tokio::test]
    async fn test_install_does_not_block_fetch() {
        let (state, network) = host().await;
        register_impl(&state, SwRegisterParams::default()).await.unwrap();
        network.route(&url("/slow.css"), Response::ok_with("text/css", "body {}"));
        network.delay(&url("/slow.css"), Duration::from_secs(3));

        let params = SwRegisterParams {
            version: Some("v2".into()),
            manifest: Some(vec!["/index.html".into(), "/app.js".into(), "/slow.css".into()]),
            ..Default::default()
        };
        let fetch = SwFetchParams { url: "/app.js".into(), method: "GET".into(), destination: None, body: None };
        let (registered, fetched) = tokio::join!(
            register_impl(&state, params),
            tokio::time::timeout(Duration::from_secs(1), fetch_impl(&state, fetch)),
        );

        let out = output(&fetched.expect("fetch waited for the install").unwrap());
        assert_eq!(out["source"], "cache");
        assert_eq!(out["body"], "asset /app.js");
        assert_eq!(output(&registered.unwrap())["state"], "installed");
        assert_eq!(state.controller().await.unwrap().version(), "v1");
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input() {
        let (state, _network) = host().await;
        let bad_version = SwRegisterParams { version: Some("v 2".into()), ..Default::default() };
        let empty_manifest = SwRegisterParams { manifest: Some(vec![]), ..Default::default() };

        assert!(register_impl(&state, bad_version).await.is_err());
        assert!(register_impl(&state, empty_manifest).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_message() {
        let (state, _network) = host().await;
        let result = message_impl(&state, SwMessageParams { message_type: "CLAIM".into() }).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_status_lists_partitions() {
        let (state, _network) = host().await;
        register_impl(&state, SwRegisterParams::default()).await.unwrap();

        let out = output(&status_impl(&state).await.unwrap());

        assert_eq!(out["active"]["state"], "activated");
        assert_eq!(out["partitions"][0]["name"], "jarvis-static-v1");
        assert_eq!(out["partitions"][0]["entries"], 2);
    }

    #[tokio::test]
    async fn test_connect_client() {
        let (state, _network) = host().await;
        register_impl(&state, SwRegisterParams::default()).await.unwrap();

        let out = output(&connect_impl(&state, ClientConnectParams { client_id: "page-1".into() }).await.unwrap());

        assert_eq!(out["id"], "page-1");
        assert_eq!(out["controller"], "v1");
        assert!(connect_impl(&state, ClientConnectParams { client_id: " ".into() }).await.is_err());
    }
}
