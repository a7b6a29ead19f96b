//! Background sync: replay requests queued while offline.

use serde::{Deserialize, Serialize};
use shellcache_core::Request;

use super::storage::CacheStorage;
use crate::fetch::{Network, resolve};

/// Known sync tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncTag {
    SendMessage,
    GenerateImage,
}

impl SyncTag {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "send-message" => Some(SyncTag::SendMessage),
            "generate-image" => Some(SyncTag::GenerateImage),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SyncTag::SendMessage => "send-message",
            SyncTag::GenerateImage => "generate-image",
        }
    }

    /// API path queued items are POSTed to.
    pub fn endpoint(self) -> &'static str {
        match self {
            SyncTag::SendMessage => "/api/chat",
            SyncTag::GenerateImage => "/api/generate-image",
        }
    }
}

/// Result of one replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub tag: String,
    pub sent: usize,
    /// Items still queued (failed or not reached).
    pub remaining: usize,
}

/// Replay the outbox for `tag`, oldest first, stopping at the first item the
/// API does not accept. Never fails: problems are logged and reported as
/// remaining items.
pub async fn replay(storage: &dyn CacheStorage, network: &dyn Network, origin: &url::Url, tag: SyncTag) -> SyncReport {
    let mut report = SyncReport { tag: tag.as_str().to_string(), sent: 0, remaining: 0 };

    let items = match storage.pending(tag.as_str()).await {
        Ok(items) => items,
        Err(e) => {
            tracing::error!(tag = tag.as_str(), error = %e, "failed to read outbox");
            return report;
        }
    };

    let endpoint = match resolve(origin, tag.endpoint()) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(tag = tag.as_str(), error = %e, "invalid sync endpoint");
            report.remaining = items.len();
            return report;
        }
    };

    for (index, item) in items.iter().enumerate() {
        let payload: serde_json::Value = match serde_json::from_str(&item.payload_json) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(id = item.id, error = %e, "dropping unparseable outbox item");
                if let Err(e) = storage.remove_queued(item.id).await {
                    tracing::warn!(id = item.id, error = %e, "unparseable item could not be removed from outbox");
                }
                continue;
            }
        };

        let delivered = match network.fetch(&Request::post_json(endpoint.as_str(), &payload)).await {
            Ok(response) if response.ok() => true,
            Ok(response) => {
                tracing::warn!(id = item.id, status = response.status, "sync item rejected");
                false
            }
            Err(e) => {
                tracing::warn!(id = item.id, error = %e, "sync item not delivered");
                false
            }
        };

        if !delivered {
            report.remaining = items.len() - index;
            return report;
        }

        report.sent += 1;
        if let Err(e) = storage.remove_queued(item.id).await {
            tracing::warn!(id = item.id, error = %e, "delivered item could not be removed from outbox");
        }
    }

    tracing::info!(tag = tag.as_str(), sent = report.sent, "background sync complete");
    report
}
