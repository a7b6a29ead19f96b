//! Offline-first request worker.
//!
//! A [`ShellWorker`] is one deployed version of the caching policy. The host
//! drives it through [`WorkerHandlers`]; a [`Registration`] owns the
//! active/waiting versions and the connected pages, and decides when each
//! handler runs.
//!
//! Layout:
//! - `storage`: the cache seam (`CacheStorage`), implemented by `CacheDb`
//! - `strategy`: cache-first and network-first
//! - `fallback`: synthetic offline responses
//! - `lifecycle`: install/activate/fetch/message/push/click/sync handlers
//! - `registration`: the version state machine
//! - `messages`, `notify`, `sync`: page messaging, notifications, outbox replay

pub mod fallback;
pub mod lifecycle;
pub mod messages;
pub mod notify;
pub mod registration;
pub mod storage;
pub mod strategy;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

use serde::{Deserialize, Serialize};
use shellcache_core::{AppConfig, NotificationConfig};

use crate::classify::ClassifierRules;

pub use fallback::OfflineFallback;
pub use lifecycle::{ActivateOutcome, FetchOutcome, ShellWorker, WorkerHandlers};
pub use messages::{ClientAction, ClientEvent, ClientMessage};
pub use notify::{Notification, NotificationAction};
pub use registration::{ClientInfo, Registration, RegistrationStatus, VersionStatus, WorkerState};
pub use storage::CacheStorage;
pub use strategy::{Source, StrategyResult};
pub use sync::{SyncReport, SyncTag};

/// Everything one worker version needs, fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub version: String,
    pub cache_prefix: String,
    pub origin: String,
    pub shell_page: String,
    /// Files cached at install, in order.
    pub manifest: Vec<String>,
    pub rules: ClassifierRules,
    pub offline_message: String,
    pub auto_skip_waiting: bool,
    pub notification: NotificationConfig,
}

impl From<&AppConfig> for WorkerConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            version: config.version.clone(),
            cache_prefix: config.cache_prefix.clone(),
            origin: config.origin.clone(),
            shell_page: config.shell_page.clone(),
            manifest: config.shell_files.clone(),
            rules: ClassifierRules::from(config),
            offline_message: config.offline_message.clone(),
            auto_skip_waiting: config.auto_skip_waiting,
            notification: config.notification.clone(),
        }
    }
}

impl WorkerConfig {
    /// Same configuration under another version string.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn cache_names(&self) -> CacheNames {
        CacheNames::new(&self.cache_prefix, &self.version)
    }
}

/// The two partition names owned by one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheNames {
    pub static_name: String,
    pub dynamic_name: String,
}

impl CacheNames {
    pub fn new(prefix: &str, version: &str) -> Self {
        Self { static_name: format!("{prefix}-static-{version}"), dynamic_name: format!("{prefix}-dynamic-{version}") }
    }

    /// True if `name` is one of this version's partitions.
    pub fn owns(&self, name: &str) -> bool {
        name == self.static_name || name == self.dynamic_name
    }
}
