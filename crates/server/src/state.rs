//! State shared by every tool call.

use std::sync::Arc;

use shellcache_client::worker::{ClientEvent, Registration, ShellWorker, WorkerConfig, WorkerHandlers, WorkerState};
use shellcache_client::{CacheStorage, Network};
use shellcache_core::{AppConfig, CacheDb, Error};
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{Mutex, RwLock, broadcast};

pub struct HostState {
    pub config: AppConfig,
    pub db: CacheDb,
    pub network: Arc<dyn Network>,
    pub registration: RwLock<Registration>,
    events: Mutex<broadcast::Receiver<ClientEvent>>,
}

impl HostState {
    pub fn new(config: AppConfig, db: CacheDb, network: Arc<dyn Network>) -> Self {
        let registration = Registration::new();
        let events = Mutex::new(registration.subscribe());
        Self { config, db, network, registration: RwLock::new(registration), events }
    }

    /// Worker configuration for the configured version.
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig::from(&self.config)
    }

    pub fn build_worker(&self, config: WorkerConfig) -> Result<Arc<ShellWorker>, Error> {
        let storage: Arc<dyn CacheStorage> = Arc::new(self.db.clone());
        Ok(Arc::new(ShellWorker::new(config, storage, Arc::clone(&self.network))?))
    }

    /// Install the version named in the configuration.
    pub async fn register_configured(&self) -> Result<WorkerState, Error> {
        let worker = self.build_worker(self.worker_config())?;
        self.register(worker).await
    }

    /// Install `worker` and commit it to the registration.
    ///
    /// The registration lock is not held while the manifest downloads, so
    /// the active version keeps serving during the install.
    pub async fn register(&self, worker: Arc<ShellWorker>) -> Result<WorkerState, Error> {
        if let Some(state) = self.registration.read().await.registered(worker.version()) {
            return Ok(state);
        }

        tracing::info!(version = worker.version(), "installing outside the registration lock");
        match worker.on_install().await {
            Ok(()) => Ok(self.registration.write().await.commit(worker).await),
            Err(e) => {
                self.registration.write().await.install_failed(worker.version());
                Err(e)
            }
        }
    }

    /// The active worker. The registration lock is released on return.
    pub async fn controller(&self) -> Option<Arc<ShellWorker>> {
        self.registration.read().await.controller()
    }

    /// Events raised towards the pages since the last call.
    pub async fn drain_events(&self) -> Vec<ClientEvent> {
        let mut receiver = self.events.lock().await;
        let mut events = Vec::new();
        loop {
            match receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Lagged(skipped)) => tracing::warn!(skipped, "dropped page events"),
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
        events
    }
}
