//! Synthetic responses for when both network and cache have failed.

use shellcache_core::{Destination, Request, Response};

use super::storage::CacheStorage;
use super::strategy::lookup;
use crate::classify::Classifier;

const PLACEHOLDER_SVG: &str = concat!(
    r#"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="200" viewBox="0 0 200 200">"#,
    r##"<rect width="200" height="200" fill="#333"/>"##,
    r##"<text x="100" y="100" text-anchor="middle" fill="#fff" font-family="Arial" font-size="14">"##,
    "Image Unavailable</text></svg>"
);

/// Offline response generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineFallback {
    shell_url: String,
    offline_message: String,
}

impl OfflineFallback {
    /// `shell_url` must be the resolved URL the shell page is cached under.
    pub fn new(shell_url: impl Into<String>, offline_message: impl Into<String>) -> Self {
        Self { shell_url: shell_url.into(), offline_message: offline_message.into() }
    }

    /// Produce a response for a request that could not be served.
    ///
    /// Navigations get the cached shell page (or the empty failure response
    /// if it is not cached), images a placeholder SVG, API calls a 503 JSON
    /// error, anything else a 503 text body.
    pub async fn respond(&self, storage: &dyn CacheStorage, classifier: &Classifier, request: &Request) -> Response {
        if request.destination == Destination::Document {
            return lookup(storage, &self.shell_url).await.unwrap_or_else(Response::error);
        }

        if classifier.is_image(&request.url) {
            return placeholder_image();
        }

        if classifier.is_api(&request.url) {
            return self.offline_json();
        }

        Response::new(503, "text/plain", "Offline")
    }

    fn offline_json(&self) -> Response {
        let body = serde_json::json!({ "error": "Offline", "message": self.offline_message });
        Response::new(503, "application/json", body.to_string())
    }
}

fn placeholder_image() -> Response {
    Response::ok_with("image/svg+xml", PLACEHOLDER_SVG)
}
