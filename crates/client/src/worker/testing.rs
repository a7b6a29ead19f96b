//! Test doubles for the worker: a scripted network and storage wrappers
//! whose writes or lookups fail.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use shellcache_core::{AppConfig, CacheDb, Error, OutboxItem, Request, Response};

use super::{CacheStorage, ShellWorker, WorkerConfig};
use crate::fetch::Network;

pub(crate) const ORIGIN: &str = "http://app.test";

pub(crate) fn url(path: &str) -> String {
    format!("{ORIGIN}{path}")
}

/// Network that answers from a route table and records every request.
/// Unrouted URLs get a 404.
#[derive(Default)]
pub(crate) struct StubNetwork {
    routes: Mutex<HashMap<String, Response>>,
    failing: Mutex<HashSet<String>>,
    offline: AtomicBool,
    requests: Mutex<Vec<Request>>,
}

impl StubNetwork {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn route(&self, url: &str, response: Response) {
        self.routes.lock().unwrap().insert(url.to_string(), response);
    }

    /// Make one URL fail at the transport level.
    pub(crate) fn fail(&self, url: &str) {
        self.failing.lock().unwrap().insert(url.to_string());
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn calls_to(&self, url: &str) -> usize {
        self.requests.lock().unwrap().iter().filter(|r| r.url == url).count()
    }

    pub(crate) fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for StubNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        self.requests.lock().unwrap().push(request.clone());
        if self.offline.load(Ordering::SeqCst) || self.failing.lock().unwrap().contains(&request.url) {
            return Err(Error::Network(format!("unreachable: {}", request.url)));
        }
        let routed = self.routes.lock().unwrap().get(&request.url).cloned();
        Ok(routed.unwrap_or_else(|| Response::new(404, "text/plain", "Not Found")))
    }
}

/// Storage whose writes always fail; reads and deletes pass through.
pub(crate) struct ReadOnlyStorage(pub(crate) CacheDb);

#[async_trait]
impl CacheStorage for ReadOnlyStorage {
    async fn open(&self, partition: &str) -> Result<(), Error> {
        self.0.open_partition(partition).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.0.partition_names().await
    }

    async fn delete(&self, partition: &str) -> Result<bool, Error> {
        self.0.delete_partition(partition).await
    }

    async fn match_any(&self, url: &str) -> Result<Option<Response>, Error> {
        self.0.match_any(url).await
    }

    async fn put(&self, _partition: &str, _url: &str, _response: &Response) -> Result<(), Error> {
        Err(Error::CorruptEntry("quota exceeded".into()))
    }

    async fn put_all(&self, _partition: &str, _entries: Vec<(String, Response)>) -> Result<(), Error> {
        Err(Error::CorruptEntry("quota exceeded".into()))
    }

    async fn enqueue(&self, _tag: &str, _payload_json: &str) -> Result<i64, Error> {
        Err(Error::CorruptEntry("quota exceeded".into()))
    }

    async fn pending(&self, tag: &str) -> Result<Vec<OutboxItem>, Error> {
        self.0.pending(tag).await
    }

    async fn remove_queued(&self, id: i64) -> Result<bool, Error> {
        self.0.remove_queued(id).await
    }
}

/// Storage whose lookups always fail; everything else passes through.
pub(crate) struct UnreadableStorage(pub(crate) CacheDb);

#[async_trait]
impl CacheStorage for UnreadableStorage {
    async fn open(&self, partition: &str) -> Result<(), Error> {
        self.0.open_partition(partition).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.0.partition_names().await
    }

    async fn delete(&self, partition: &str) -> Result<bool, Error> {
        self.0.delete_partition(partition).await
    }

    async fn match_any(&self, url: &str) -> Result<Option<Response>, Error> {
        Err(Error::CorruptEntry(format!("unreadable entry for {url}")))
    }

    async fn put(&self, partition: &str, url: &str, response: &Response) -> Result<(), Error> {
        self.0.put_entry(partition, url, response).await
    }

    async fn put_all(&self, partition: &str, entries: Vec<(String, Response)>) -> Result<(), Error> {
        self.0.put_entries(partition, entries).await
    }

    async fn enqueue(&self, tag: &str, payload_json: &str) -> Result<i64, Error> {
        self.0.enqueue(tag, payload_json).await
    }

    async fn pending(&self, tag: &str) -> Result<Vec<OutboxItem>, Error> {
        self.0.pending(tag).await
    }

    async fn remove_queued(&self, id: i64) -> Result<bool, Error> {
        self.0.remove_queued(id).await
    }
}

/// Worker config rooted at [`ORIGIN`] with the given version and manifest.
pub(crate) fn worker_config(version: &str, manifest: &[&str]) -> WorkerConfig {
    let app = AppConfig {
        version: version.to_string(),
        origin: ORIGIN.to_string(),
        shell_files: manifest.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    };
    WorkerConfig::from(&app)
}

/// Route every manifest entry to a small 200 response.
pub(crate) fn serve_manifest(network: &StubNetwork, manifest: &[&str]) {
    for path in manifest {
        network.route(&url(path), Response::ok_with("text/plain", format!("asset {path}")));
    }
}

pub(crate) fn worker(
    version: &str, manifest: &[&str], storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>,
) -> Arc<ShellWorker> {
    Arc::new(ShellWorker::new(worker_config(version, manifest), storage, network).unwrap())
}
