//! One deployed worker version and its event handlers.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shellcache_core::{Error, Request};

use super::fallback::OfflineFallback;
use super::messages::{ClientAction, ClientMessage};
use super::notify::{self, Notification};
use super::storage::CacheStorage;
use super::strategy::{self, StrategyContext, StrategyResult};
use super::sync::{self, SyncReport, SyncTag};
use super::{CacheNames, WorkerConfig};
use crate::classify::{ClassifiedRequest, Classifier, Strategy};
use crate::fetch::{Network, parse_origin, resolve};

/// Partitions removed during activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivateOutcome {
    pub deleted: Vec<String>,
    /// Take control of every connected page.
    pub claim: bool,
}

/// What happened to an outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not handled; the host performs the request unmodified.
    Passthrough,
    /// Served by a strategy. `request` carries the resolved URL.
    Intercepted { request: ClassifiedRequest, result: StrategyResult },
}

/// Entry points the host invokes on a worker.
#[async_trait]
pub trait WorkerHandlers: Send + Sync {
    /// Pre-cache the manifest. All-or-nothing.
    async fn on_install(&self) -> Result<(), Error>;

    /// Remove partitions that belong to other versions.
    async fn on_activate(&self) -> Result<ActivateOutcome, Error>;

    async fn on_fetch(&self, request: Request) -> FetchOutcome;

    /// Returns true when the message asks this worker to stop waiting.
    fn on_message(&self, message: &ClientMessage) -> bool;

    fn on_push(&self, payload: Option<&str>) -> Notification;

    /// `clients` are the ids of the pages this worker controls.
    fn on_notification_click(&self, action: Option<&str>, clients: &[String]) -> ClientAction;

    /// Replay queued requests for `tag`. Unknown tags report nothing sent.
    async fn on_sync(&self, tag: &str) -> SyncReport;
}

/// A single version of the caching policy.
pub struct ShellWorker {
    config: WorkerConfig,
    origin: url::Url,
    names: CacheNames,
    classifier: Classifier,
    fallback: OfflineFallback,
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
}

impl std::fmt::Debug for ShellWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellWorker")
            .field("version", &self.config.version)
            .field("origin", &self.origin.as_str())
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

impl ShellWorker {
    /// Build a worker version.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUrl` if the origin, a shell file or the shell
    /// page cannot be resolved, and `Error::InvalidInput` for a bad API pattern.
    pub fn new(config: WorkerConfig, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>) -> Result<Self, Error> {
        let origin = parse_origin(&config.origin).map_err(|e| Error::InvalidUrl(format!("origin: {e}")))?;
        let classifier = Classifier::new(&config.rules, &origin)?;
        let shell_url = resolve(&origin, &config.shell_page)
            .map_err(|e| Error::InvalidUrl(format!("shell page {}: {e}", config.shell_page)))?;
        let fallback = OfflineFallback::new(shell_url, config.offline_message.clone());
        let names = config.cache_names();

        Ok(Self { config, origin, names, classifier, fallback, storage, network })
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn cache_names(&self) -> &CacheNames {
        &self.names
    }

    /// The application root, opened when a notification is clicked with no
    /// page around.
    pub fn root_url(&self) -> &str {
        self.origin.as_str()
    }

    /// Resolve a page-relative URL against the origin.
    pub fn resolve(&self, input: &str) -> Result<String, Error> {
        resolve(&self.origin, input)
            .map(String::from)
            .map_err(|e| Error::InvalidUrl(format!("{input}: {e}")))
    }

    /// Store a request for background sync.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for an unknown tag.
    pub async fn queue(&self, tag: &str, payload: &serde_json::Value) -> Result<i64, Error> {
        let tag = SyncTag::parse(tag).ok_or_else(|| Error::InvalidInput(format!("unknown sync tag: {tag}")))?;
        let id = self.storage.enqueue(tag.as_str(), &payload.to_string()).await?;
        tracing::debug!(tag = tag.as_str(), id, "queued request for background sync");
        Ok(id)
    }

    fn context(&self) -> StrategyContext<'_> {
        StrategyContext {
            storage: self.storage.as_ref(),
            network: self.network.as_ref(),
            classifier: &self.classifier,
            fallback: &self.fallback,
        }
    }
}

#[async_trait]
impl WorkerHandlers for ShellWorker {
    async fn on_install(&self) -> Result<(), Error> {
        let version = self.version();
        tracing::info!(version, files = self.config.manifest.len(), "installing");

        let mut entries = Vec::with_capacity(self.config.manifest.len());
        for file in &self.config.manifest {
            let url = self.resolve(file).map_err(|e| Error::InstallFailed(e.to_string()))?;
            let response = match self.network.fetch(&Request::get(url.clone())).await {
                Ok(response) if response.ok() => response,
                Ok(response) => {
                    tracing::error!(version, %url, status = response.status, "install fetch rejected");
                    return Err(Error::InstallFailed(format!("{url}: status {}", response.status)));
                }
                Err(e) => {
                    tracing::error!(version, %url, error = %e, "install fetch failed");
                    return Err(Error::InstallFailed(format!("{url}: {e}")));
                }
            };
            entries.push((url, response));
        }

        let written = match self.storage.open(&self.names.static_name).await {
            Ok(()) => self.storage.put_all(&self.names.static_name, entries).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            tracing::error!(version, error = %e, "install could not write the shell");
            return Err(Error::InstallFailed(e.to_string()));
        }

        tracing::info!(version, partition = %self.names.static_name, "installed");
        Ok(())
    }

    async fn on_activate(&self) -> Result<ActivateOutcome, Error> {
        let mut deleted = Vec::new();
        for name in self.storage.keys().await? {
            if self.names.owns(&name) {
                continue;
            }
            match self.storage.delete(&name).await {
                Ok(true) => {
                    tracing::info!(partition = %name, "deleted stale partition");
                    deleted.push(name);
                }
                Ok(false) => {}
                Err(e) => tracing::warn!(partition = %name, error = %e, "failed to delete stale partition"),
            }
        }
        tracing::info!(version = self.version(), deleted = deleted.len(), "activated");
        Ok(ActivateOutcome { deleted, claim: true })
    }

    async fn on_fetch(&self, mut request: Request) -> FetchOutcome {
        if !request.is_get() {
            return FetchOutcome::Passthrough;
        }

        let classified = match self.resolve(&request.url) {
            Ok(url) => self.classifier.classify_request(url),
            Err(e) => {
                tracing::debug!(error = %e, "not intercepting unresolvable request");
                return FetchOutcome::Passthrough;
            }
        };
        request.url.clone_from(&classified.url);

        let ctx = self.context();
        let result = match classified.category.strategy() {
            Strategy::CacheFirst => strategy::cache_first(&ctx, &request, &self.names.static_name).await,
            Strategy::NetworkFirst => strategy::network_first(&ctx, &request, &self.names.dynamic_name).await,
        };
        tracing::debug!(url = %classified.url, category = %classified.category, source = ?result.source, "served");

        FetchOutcome::Intercepted { request: classified, result }
    }

    fn on_message(&self, message: &ClientMessage) -> bool {
        match message {
            ClientMessage::SkipWaiting => {
                tracing::info!(version = self.version(), "skip waiting requested");
                true
            }
        }
    }

    fn on_push(&self, payload: Option<&str>) -> Notification {
        Notification::for_push(&self.config.notification, payload)
    }

    fn on_notification_click(&self, action: Option<&str>, clients: &[String]) -> ClientAction {
        notify::click_action(action, clients, self.root_url())
    }

    async fn on_sync(&self, tag: &str) -> SyncReport {
        match SyncTag::parse(tag) {
            Some(tag) => sync::replay(self.storage.as_ref(), self.network.as_ref(), &self.origin, tag).await,
            None => {
                tracing::debug!(tag, "ignoring unknown sync tag");
                SyncReport { tag: tag.to_string(), sent: 0, remaining: 0 }
            }
        }
    }
}
