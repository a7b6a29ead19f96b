//! Messages exchanged with the page layer.

use serde::{Deserialize, Serialize};

use super::notify::Notification;

/// Message posted by a page to the worker.
///
/// Wire shape: `{"type":"SKIP_WAITING"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    SkipWaiting,
}

/// Event the worker side raises towards the pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// A new version is installed and waiting; prompt the user.
    UpdateAvailable { version: String },
    /// A new version took control; pages should reload.
    ControllerChange { version: String },
    Notification(Notification),
}

/// What the host should do with its client pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClientAction {
    Focus { client_id: String },
    OpenWindow { url: String },
    None,
}
