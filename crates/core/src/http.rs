//! Request and response snapshots exchanged between the host, the worker
//! engine and the cache.
//!
//! These are deliberately plain data: the cache stores a `Response` verbatim
//! and hands back an identical copy, and "cloning a response" is a `Clone`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// What kind of resource the page expects back.
///
/// Only `Document` changes worker behavior (navigations fall back to the
/// cached shell page); the rest is informational.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Image,
    Script,
    Style,
    Font,
    Manifest,
    #[default]
    Empty,
}

impl Destination {
    /// Best guess at the destination of a URL from its extension.
    ///
    /// Used when the worker issues its own requests (install, sync).
    pub fn infer(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url).to_ascii_lowercase();
        if path.ends_with(".css") {
            Destination::Style
        } else if path.ends_with(".js") {
            Destination::Script
        } else if path.ends_with("manifest.json") || path.ends_with(".webmanifest") {
            Destination::Manifest
        } else if [".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".ico"]
            .iter()
            .any(|ext| path.ends_with(ext))
        {
            Destination::Image
        } else if path.ends_with(".woff") || path.ends_with(".woff2") {
            Destination::Font
        } else if path.ends_with('/') || path.ends_with(".html") {
            Destination::Document
        } else {
            Destination::Empty
        }
    }
}

/// An outgoing request as seen by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Upper-case HTTP method.
    pub method: String,
    pub url: String,
    pub destination: Destination,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Vec<u8>>,
}

impl Request {
    /// A GET request with the destination inferred from the URL.
    pub fn get(url: impl Into<String>) -> Self {
        let url = url.into();
        let destination = Destination::infer(&url);
        Self { method: "GET".into(), url, destination, headers: BTreeMap::new(), body: None }
    }

    /// A GET request for a page navigation.
    pub fn navigate(url: impl Into<String>) -> Self {
        Self { destination: Destination::Document, ..Self::get(url) }
    }

    /// A JSON POST request.
    pub fn post_json(url: impl Into<String>, payload: &serde_json::Value) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        Self {
            method: "POST".into(),
            url: url.into(),
            destination: Destination::Empty,
            headers,
            body: Some(payload.to_string().into_bytes()),
        }
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}

/// A response snapshot: status, headers (lower-case names) and body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), content_type.to_string());
        Self { status, headers, body: body.into() }
    }

    /// `200 OK` with the given content type.
    pub fn ok_with(content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, content_type, body)
    }

    /// The empty failure response: status 0, no headers, no body.
    pub fn error() -> Self {
        Self { status: 0, headers: BTreeMap::new(), body: Vec::new() }
    }

    /// True for 2xx statuses.
    pub fn ok(&self) -> bool {
        (200..=299).contains(&self.status)
    }

    /// True for the empty failure response.
    pub fn is_error(&self) -> bool {
        self.status == 0
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(String::as_str)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
