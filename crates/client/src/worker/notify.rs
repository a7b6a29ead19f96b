//! Push notifications and notification clicks.

use serde::{Deserialize, Serialize};
use shellcache_core::NotificationConfig;

use super::messages::ClientAction;

/// A button on a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationData {
    /// Milliseconds since the Unix epoch.
    pub date_of_arrival: i64,
    pub primary_key: u32,
}

/// A user-facing notification shown in response to a push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

pub const ACTION_OPEN: &str = "open";
pub const ACTION_CLOSE: &str = "close";

impl Notification {
    /// Build the notification for a push; an empty payload uses the default body.
    pub fn for_push(config: &NotificationConfig, payload: Option<&str>) -> Self {
        let body = payload
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map_or_else(|| config.body.clone(), str::to_string);

        let action = |action: &str, title: &str| NotificationAction {
            action: action.to_string(),
            title: title.to_string(),
            icon: config.badge.clone(),
        };

        Self {
            title: config.title.clone(),
            body,
            icon: config.icon.clone(),
            badge: config.badge.clone(),
            vibrate: config.vibrate.clone(),
            data: NotificationData { date_of_arrival: chrono::Utc::now().timestamp_millis(), primary_key: 1 },
            actions: vec![action(ACTION_OPEN, &format!("Open {}", config.title)), action(ACTION_CLOSE, "Close")],
        }
    }
}

/// Decide what a notification click does.
///
/// `open` focuses the first connected page, or opens `root_url` when none is
/// connected. Any other action only dismisses the notification.
pub fn click_action(action: Option<&str>, clients: &[String], root_url: &str) -> ClientAction {
    match action {
        Some(ACTION_OPEN) => match clients.first() {
            Some(client_id) => ClientAction::Focus { client_id: client_id.clone() },
            None => ClientAction::OpenWindow { url: root_url.to_string() },
        },
        _ => ClientAction::None,
    }
}
