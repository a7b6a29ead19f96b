//! Shared fixtures for tool tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rmcp::model::CallToolResult;
use shellcache_client::Network;
use shellcache_core::{AppConfig, CacheDb, Error, Request, Response};

use crate::state::HostState;

pub(crate) const ORIGIN: &str = "http://app.test";

pub(crate) fn url(path: &str) -> String {
    format!("{ORIGIN}{path}")
}

/// Network answering from a route table; unrouted URLs get a 404.
#[derive(Default)]
pub(crate) struct RoutedNetwork {
    routes: Mutex<HashMap<String, Response>>,
    delays: Mutex<HashMap<String, Duration>>,
    offline: AtomicBool,
    calls: Mutex<Vec<Request>>,
}

impl RoutedNetwork {
    pub(crate) fn route(&self, url: &str, response: Response) {
        self.routes.lock().unwrap().insert(url.to_string(), response);
    }

    /// Hold responses for `url` back by `delay`.
    pub(crate) fn delay(&self, url: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(url.to_string(), delay);
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> Vec<Request> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for RoutedNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.calls.lock().unwrap().push(request.clone());
        let delay = self.delays.lock().unwrap().get(&request.url).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("unreachable: {}", request.url)));
        }
        let routed = self.routes.lock().unwrap().get(&request.url).cloned();
        Ok(routed.unwrap_or_else(|| Response::new(404, "text/plain", "Not Found")))
    }
}

pub(crate) const MANIFEST: &[&str] = &["/index.html", "/app.js"];

/// Host state over an in-memory cache with the manifest routed.
pub(crate) async fn host() -> (Arc<HostState>, Arc<RoutedNetwork>) {
    let config = AppConfig {
        origin: ORIGIN.to_string(),
        version: "v1".to_string(),
        shell_files: MANIFEST.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    };
    let network = Arc::new(RoutedNetwork::default());
    for path in MANIFEST {
        network.route(&url(path), Response::ok_with("text/plain", format!("asset {path}")));
    }
    let db = CacheDb::open_in_memory().await.unwrap();
    (Arc::new(HostState::new(config, db, network.clone())), network)
}

/// Parse the JSON text block of a tool result.
pub(crate) fn output(result: &CallToolResult) -> serde_json::Value {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
