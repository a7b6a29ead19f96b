//! sw_fetch tool implementation.
//!
//! Sends one page request through the active worker. Requests the worker
//! does not intercept go straight to the network, as a browser would do.

use std::collections::BTreeMap;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shellcache_client::fetch::{parse_origin, resolve};
use shellcache_client::worker::{FetchOutcome, Source, WorkerHandlers};
use shellcache_core::{Destination, Error, Request, Response};

use super::json_result;
use crate::error::ToolError;
use crate::state::HostState;

/// Parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Request URL, absolute or relative to the application origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request destination; "document" marks a page navigation.
    /// Inferred from the URL when omitted.
    #[serde(default)]
    pub destination: Option<Destination>,

    /// Request body, sent as-is.
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

#[derive(Debug, Clone, Serialize)]
pub struct SwFetchOutput {
    pub url: String,
    /// Request category, absent when the worker did not intercept.
    pub category: Option<String>,
    /// One of cache, network, fallback, passthrough.
    pub source: &'static str,
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl SwFetchOutput {
    fn new(url: String, category: Option<String>, source: &'static str, response: Response) -> Self {
        let body = String::from_utf8_lossy(&response.body).into_owned();
        Self { url, category, source, status: response.status, headers: response.headers, body }
    }
}

fn source_name(source: Source) -> &'static str {
    match source {
        Source::Cache => "cache",
        Source::Network => "network",
        Source::Fallback => "fallback",
    }
}

fn build_request(params: SwFetchParams) -> Result<Request, ToolError> {
    if params.url.trim().is_empty() {
        return Err(ToolError::InvalidInput("url cannot be empty".into()));
    }
    let method = params.method.trim().to_ascii_uppercase();
    if method.is_empty() || !method.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ToolError::InvalidInput(format!("invalid method: {}", params.method)));
    }

    let mut request = Request::get(params.url);
    request.method = method;
    if let Some(destination) = params.destination {
        request.destination = destination;
    }
    request.body = params.body.map(String::into_bytes);
    Ok(request)
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(state: &HostState, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    let request = build_request(params)?;

    let outcome = match state.controller().await {
        Some(worker) => worker.on_fetch(request.clone()).await,
        None => FetchOutcome::Passthrough,
    };

    let output = match outcome {
        FetchOutcome::Intercepted { request: classified, result } => SwFetchOutput::new(
            classified.url,
            Some(classified.category.to_string()),
            source_name(result.source),
            result.response,
        ),
        FetchOutcome::Passthrough => {
            let origin = parse_origin(&state.config.origin).map_err(|e| Error::InvalidUrl(e.to_string()))?;
            let url = resolve(&origin, &request.url).map_err(|e| Error::InvalidUrl(format!("{}: {e}", request.url)))?;
            let request = Request { url: url.to_string(), ..request };
            tracing::debug!(method = %request.method, url = %request.url, "passthrough request");
            let response = state.network.fetch(&request).await?;
            SwFetchOutput::new(request.url, None, "passthrough", response)
        }
    };

    json_result(&output)
}
