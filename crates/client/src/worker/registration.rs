//! Version state machine: which worker is active, which is waiting, and
//! which pages each one controls.
//!
//! A `Registration` is owned by the host and usually kept behind an async
//! `RwLock`. Lifecycle transitions take `&mut self`; request handling only
//! needs the active worker, so hosts should clone it with
//! [`Registration::controller`] and drop the lock before fetching.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shellcache_core::Error;
use tokio::sync::broadcast;

use super::lifecycle::{ShellWorker, WorkerHandlers};
use super::messages::{ClientAction, ClientEvent, ClientMessage};
use super::notify::Notification;
use super::sync::SyncReport;

const EVENT_CAPACITY: usize = 64;

/// Lifecycle state of one worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Installing,
    /// Installed and waiting for the active version to let go.
    Installed,
    Activating,
    Activated,
    /// Failed to install, or replaced by a newer version.
    Redundant,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// A connected page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub id: String,
    /// Version controlling this page, if any.
    pub controller: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionStatus {
    pub version: String,
    pub state: WorkerState,
}

/// Snapshot of the registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationStatus {
    pub active: Option<VersionStatus>,
    pub waiting: Option<VersionStatus>,
    /// Versions that failed or were replaced, oldest first.
    pub redundant: Vec<String>,
    pub clients: Vec<ClientInfo>,
}

struct Slot {
    worker: Arc<ShellWorker>,
    state: WorkerState,
}

impl Slot {
    fn status(&self) -> VersionStatus {
        VersionStatus { version: self.worker.version().to_string(), state: self.state }
    }
}

pub struct Registration {
    active: Option<Slot>,
    waiting: Option<Slot>,
    redundant: Vec<String>,
    clients: Vec<ClientInfo>,
    events: broadcast::Sender<ClientEvent>,
}

impl Default for Registration {
    fn default() -> Self {
        Self::new()
    }
}

impl Registration {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { active: None, waiting: None, redundant: Vec::new(), clients: Vec::new(), events }
    }

    /// Receive events raised towards the pages.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Install a new worker version and commit it.
    ///
    /// Holds `&mut self` for the whole install. Hosts that share the
    /// registration behind a lock should use [`Registration::registered`],
    /// run `on_install` without the lock, and then call
    /// [`Registration::commit`] or [`Registration::install_failed`].
    ///
    /// # Errors
    ///
    /// Returns `Error::InstallFailed` if install fails; the worker is marked
    /// redundant and the current version keeps serving.
    pub async fn register(&mut self, worker: Arc<ShellWorker>) -> Result<WorkerState, Error> {
        if let Some(state) = self.registered(worker.version()) {
            return Ok(state);
        }

        tracing::info!(version = worker.version(), state = %WorkerState::Installing, "registering");
        if let Err(e) = worker.on_install().await {
            self.install_failed(worker.version());
            return Err(e);
        }
        Ok(self.commit(worker).await)
    }

    /// State of `version` if it is already active or waiting.
    pub fn registered(&self, version: &str) -> Option<WorkerState> {
        let slot = [&self.active, &self.waiting].into_iter().flatten().find(|slot| slot.worker.version() == version)?;
        tracing::debug!(version, state = %slot.state, "version already registered");
        Some(slot.state)
    }

    /// Record a version whose install failed. The current version keeps serving.
    pub fn install_failed(&mut self, version: &str) {
        tracing::error!(version, "install failed; version is redundant");
        self.redundant.push(version.to_string());
    }

    /// Take an installed worker into the registration.
    ///
    /// With no active version, or when the worker is configured to skip
    /// waiting, the new version activates straight away. Otherwise it
    /// replaces any waiting version, and pages under the current version get
    /// `UpdateAvailable`. Committing the active or waiting version again is
    /// a no-op.
    pub async fn commit(&mut self, worker: Arc<ShellWorker>) -> WorkerState {
        let version = worker.version().to_string();
        if let Some(state) = self.registered(&version) {
            return state;
        }

        if let Some(replaced) = self.waiting.take() {
            tracing::info!(version = replaced.worker.version(), "waiting version replaced");
            self.redundant.push(replaced.worker.version().to_string());
        }

        if self.active.is_none() || worker.config().auto_skip_waiting {
            self.activate(worker).await;
            return WorkerState::Activated;
        }

        tracing::info!(%version, state = %WorkerState::Installed, "waiting for active version to release");
        self.waiting = Some(Slot { worker, state: WorkerState::Installed });
        if self.controlled_clients().next().is_some() {
            self.emit(ClientEvent::UpdateAvailable { version });
        }
        WorkerState::Installed
    }

    /// Deliver a page message to the waiting version. Returns true if it
    /// took over as the active version.
    pub async fn post_message(&mut self, message: ClientMessage) -> bool {
        let Some(waiting) = self.waiting.as_ref() else {
            tracing::debug!(?message, "no waiting version; message ignored");
            return false;
        };

        if !waiting.worker.on_message(&message) {
            return false;
        }

        match self.waiting.take() {
            Some(slot) => {
                self.activate(slot.worker).await;
                true
            }
            None => false,
        }
    }

    async fn activate(&mut self, worker: Arc<ShellWorker>) {
        let version = worker.version().to_string();
        tracing::info!(%version, state = %WorkerState::Activating, "activating");

        let claim = match worker.on_activate().await {
            Ok(outcome) => outcome.claim,
            Err(e) => {
                tracing::warn!(%version, error = %e, "activation cleanup failed");
                true
            }
        };

        if let Some(old) = self.active.replace(Slot { worker, state: WorkerState::Activated }) {
            tracing::info!(version = old.worker.version(), "previous version is redundant");
            self.redundant.push(old.worker.version().to_string());
        }

        if !claim {
            return;
        }
        let mut changed = false;
        for client in &mut self.clients {
            if client.controller.as_deref() != Some(version.as_str()) {
                client.controller = Some(version.clone());
                changed = true;
            }
        }
        if changed {
            self.emit(ClientEvent::ControllerChange { version });
        }
    }

    /// The active worker, if any.
    pub fn controller(&self) -> Option<Arc<ShellWorker>> {
        self.active.as_ref().map(|slot| Arc::clone(&slot.worker))
    }

    pub fn waiting(&self) -> Option<Arc<ShellWorker>> {
        self.waiting.as_ref().map(|slot| Arc::clone(&slot.worker))
    }

    /// Attach a page. A page that connects while a version is active is
    /// controlled by it. Connecting an existing id returns it unchanged.
    pub fn connect_client(&mut self, id: &str) -> ClientInfo {
        if let Some(existing) = self.clients.iter().find(|c| c.id == id) {
            return existing.clone();
        }
        let client = ClientInfo {
            id: id.to_string(),
            controller: self.active.as_ref().map(|slot| slot.worker.version().to_string()),
        };
        tracing::debug!(id, controller = ?client.controller, "client connected");
        self.clients.push(client.clone());
        client
    }

    pub fn status(&self) -> RegistrationStatus {
        RegistrationStatus {
            active: self.active.as_ref().map(Slot::status),
            waiting: self.waiting.as_ref().map(Slot::status),
            redundant: self.redundant.clone(),
            clients: self.clients.clone(),
        }
    }

    /// Deliver a push to the active worker and raise its notification.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidState` when no version is active.
    pub fn push(&self, payload: Option<&str>) -> Result<Notification, Error> {
        let notification = self.require_active()?.on_push(payload);
        self.emit(ClientEvent::Notification(notification.clone()));
        Ok(notification)
    }

    pub fn notification_click(&self, action: Option<&str>) -> Result<ClientAction, Error> {
        let worker = self.require_active()?;
        let clients: Vec<String> = self.controlled_clients().map(|c| c.id.clone()).collect();
        Ok(worker.on_notification_click(action, &clients))
    }

    pub async fn sync(&self, tag: &str) -> Result<SyncReport, Error> {
        let worker = self.require_active()?;
        Ok(worker.on_sync(tag).await)
    }

    fn require_active(&self) -> Result<Arc<ShellWorker>, Error> {
        self.controller().ok_or_else(|| Error::InvalidState("no active worker".into()))
    }

    fn controlled_clients(&self) -> impl Iterator<Item = &ClientInfo> {
        let active = self.active.as_ref().map(|slot| slot.worker.version());
        self.clients.iter().filter(move |c| active.is_some() && c.controller.as_deref() == active)
    }

    fn emit(&self, event: ClientEvent) {
        // No subscribers is fine: pages may not be listening.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::testing::{StubNetwork, serve_manifest, url, worker};
    use shellcache_core::{CacheDb, Response};

    const MANIFEST: &[&str] = &["/index.html", "/app.js"];

    async fn setup() -> (CacheDb, Arc<StubNetwork>, Registration) {
        let db = CacheDb::open_in_memory().await.unwrap();
        let network = StubNetwork::new();
        serve_manifest(&network, MANIFEST);
        (db, network, Registration::new())
    }

    #[tokio::test]
    async fn test_first_version_activates() {
        let (db, network, mut reg) = setup().await;

        let state = reg.register(worker("v1", MANIFEST, Arc::new(db.clone()), network.clone())).await.unwrap();

        assert_eq!(state, WorkerState::Activated);
        let status = reg.status();
        assert_eq!(status.active.unwrap().version, "v1");
        assert!(status.waiting.is_none());
        let urls = db.entry_urls("jarvis-static-v1").await.unwrap();
        assert!(urls.contains(&url("/index.html")) && urls.contains(&url("/app.js")));
    }

    #[tokio::test]
    async fn test_skip_waiting_replaces_version() {
        let (db, network, mut reg) = setup().await;
        let mut events = reg.subscribe();

        reg.register(worker("v1", MANIFEST, Arc::new(db.clone()), network.clone())).await.unwrap();
        reg.connect_client("page-1");
        db.put_entry("jarvis-dynamic-v1", &url("/api/status"), &Response::ok_with("application/json", "{}"))
            .await
            .unwrap();

        let state = reg.register(worker("v2", MANIFEST, Arc::new(db.clone()), network.clone())).await.unwrap();
        assert_eq!(state, WorkerState::Installed);
        assert_eq!(reg.controller().unwrap().version(), "v1");
        assert_eq!(events.try_recv().unwrap(), ClientEvent::UpdateAvailable { version: "v2".into() });

        assert!(reg.post_message(ClientMessage::SkipWaiting).await);

        let status = reg.status();
        assert_eq!(status.active.unwrap().version, "v2");
        assert!(status.waiting.is_none());
        assert_eq!(status.redundant, vec!["v1"]);
        assert_eq!(status.clients[0].controller.as_deref(), Some("v2"));
        assert_eq!(events.try_recv().unwrap(), ClientEvent::ControllerChange { version: "v2".into() });
        assert_eq!(db.partition_names().await.unwrap(), vec!["jarvis-static-v2"]);
    }

    #[tokio::test]
    async fn test_skip_waiting_without_waiting_is_noop() {
        let (db, network, mut reg) = setup().await;
        reg.register(worker("v1", MANIFEST, Arc::new(db.clone()), network.clone())).await.unwrap();

        assert!(!reg.post_message(ClientMessage::SkipWaiting).await);
        assert_eq!(reg.controller().unwrap().version(), "v1");
    }

    #[tokio::test]
    async fn test_install_failure_keeps_previous_version() {
        let (db, network, mut reg) = setup().await;
        reg.register(worker("v1", MANIFEST, Arc::new(db.clone()), network.clone())).await.unwrap();

        let broken = worker("v2", &["/index.html", "/gone.js"], Arc::new(db.clone()), network.clone());
        let err = reg.register(broken).await.unwrap_err();

        assert!(matches!(err, Error::InstallFailed(_)));
        let status = reg.status();
        assert_eq!(status.active.unwrap().version, "v1");
        assert!(status.waiting.is_none());
        assert_eq!(status.redundant, vec!["v2"]);
        assert!(!db.has_partition("jarvis-static-v2").await.unwrap());
    }

    #[tokio::test]
    async fn test_no_update_event_without_controlled_clients() {
        let (db, network, mut reg) = setup().await;
        let mut events = reg.subscribe();
        reg.register(worker("v1", MANIFEST, Arc::new(db.clone()), network.clone())).await.unwrap();
        reg.register(worker("v2", MANIFEST, Arc::new(db.clone()), network.clone())).await.unwrap();

        assert!(events.try_recv().is_err());
        assert_eq!(reg.waiting().unwrap().version(), "v2");
    }

    #[tokio::test]
    async fn test_register_same_version_is_noop() {
        let (db, network, mut reg) = setup().await;
        reg.register(worker("v1", MANIFEST, Arc::new(db.clone()), network.clone())).await.unwrap();
        let calls = network.calls();

        let state = reg.register(worker("v1", MANIFEST, Arc::new(db.clone()), network.clone())).await.unwrap();

        assert_eq!(state, WorkerState::Activated);
        assert_eq!(network.calls(), calls);
    }

    #[tokio::test]
    async fn test_commit_after_unlocked_install() {
        let (db, network, mut reg) = setup().await;
        reg.register(worker("v1", MANIFEST, Arc::new(db.clone()), network.clone())).await.unwrap();
        reg.connect_client("page-1");
        let mut events = reg.subscribe();

        let v2 = worker("v2", MANIFEST, Arc::new(db.clone()), network.clone());
        assert_eq!(reg.registered("v2"), None);
        v2.on_install().await.unwrap();
        assert_eq!(reg.controller().unwrap().version(), "v1");

        assert_eq!(reg.commit(Arc::clone(&v2)).await, WorkerState::Installed);
        assert_eq!(reg.registered("v2"), Some(WorkerState::Installed));
        assert_eq!(events.try_recv().unwrap(), ClientEvent::UpdateAvailable { version: "v2".into() });

        // A second commit of the same version, e.g. from a concurrent install, changes nothing.
        assert_eq!(reg.commit(v2).await, WorkerState::Installed);
        assert!(events.try_recv().is_err());
        assert!(reg.status().redundant.is_empty());
    }

    #[tokio::test]
    async fn test_install_failed_marks_redundant() {
        let (db, network, mut reg) = setup().await;
        reg.register(worker("v1", MANIFEST, Arc::new(db.clone()), network.clone())).await.unwrap();

        reg.install_failed("v2");

        let status = reg.status();
        assert_eq!(status.active.unwrap().version, "v1");
        assert_eq!(status.redundant, vec!["v2"]);
    }

    #[tokio::test]
    async fn test_connect_before_activation_is_claimed() {
        let (db, network, mut reg) = setup().await;
        let mut events = reg.subscribe();
        assert_eq!(reg.connect_client("page-1").controller, None);

        reg.register(worker("v1", MANIFEST, Arc::new(db.clone()), network.clone())).await.unwrap();

        assert_eq!(reg.status().clients[0].controller.as_deref(), Some("v1"));
        assert_eq!(events.try_recv().unwrap(), ClientEvent::ControllerChange { version: "v1".into() });
        assert_eq!(reg.connect_client("page-2").controller.as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn test_push_and_click() {
        let (db, network, mut reg) = setup().await;
        assert!(matches!(reg.push(None), Err(Error::InvalidState(_))));

        reg.register(worker("v1", MANIFEST, Arc::new(db.clone()), network.clone())).await.unwrap();
        let mut events = reg.subscribe();

        let notification = reg.push(Some("hello")).unwrap();
        assert_eq!(notification.body, "hello");
        assert!(matches!(events.try_recv().unwrap(), ClientEvent::Notification(n) if n.body == "hello"));

        assert_eq!(
            reg.notification_click(Some("open")).unwrap(),
            ClientAction::OpenWindow { url: "http://app.test/".into() }
        );
        reg.connect_client("page-1");
        assert_eq!(
            reg.notification_click(Some("open")).unwrap(),
            ClientAction::Focus { client_id: "page-1".into() }
        );
    }

    #[tokio::test]
    async fn test_sync_through_registration() {
        let (db, network, mut reg) = setup().await;
        network.route(&url("/api/chat"), Response::ok_with("application/json", "{}"));
        reg.register(worker("v1", MANIFEST, Arc::new(db.clone()), network.clone())).await.unwrap();
        let w = reg.controller().unwrap();
        w.queue("send-message", &serde_json::json!({"message": "hi"})).await.unwrap();

        let report = reg.sync("send-message").await.unwrap();

        assert_eq!((report.sent, report.remaining), (1, 0));
    }
}
