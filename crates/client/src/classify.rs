//! Request classification.
//!
//! Every intercepted URL gets exactly one [`Category`], which decides its
//! caching strategy. Classification is pure: the rule lists are fixed when
//! the [`Classifier`] is built and the same URL always gets the same tag.
//!
//! Check order is image, static, api, other. Image comes first so that any
//! URL with an image extension is an image even when it is also a shell
//! file; both categories route cache-first, so the strategy is unaffected.

use std::collections::HashSet;

use regex::Regex;
use serde::{Deserialize, Serialize};
use shellcache_core::{AppConfig, Error};

use crate::fetch::resolve;

/// Request category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Static,
    Api,
    Image,
    Other,
}

/// Which source is consulted first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    CacheFirst,
    NetworkFirst,
}

impl Category {
    pub fn strategy(self) -> Strategy {
        match self {
            Category::Static | Category::Image => Strategy::CacheFirst,
            Category::Api | Category::Other => Strategy::NetworkFirst,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Static => "static",
            Category::Api => "api",
            Category::Image => "image",
            Category::Other => "other",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request URL with its category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedRequest {
    pub url: String,
    pub category: Category,
}

/// Raw classification rules, usually taken from [`AppConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierRules {
    /// Shell files; relative entries resolve against the origin.
    pub shell_files: Vec<String>,
    pub static_extensions: Vec<String>,
    pub image_extensions: Vec<String>,
    pub static_hosts: Vec<String>,
    pub api_prefix: String,
    /// Regexes matched against the URL path.
    pub api_patterns: Vec<String>,
}

impl From<&AppConfig> for ClassifierRules {
    fn from(config: &AppConfig) -> Self {
        Self {
            shell_files: config.shell_files.clone(),
            static_extensions: config.static_extensions.clone(),
            image_extensions: config.image_extensions.clone(),
            static_hosts: config.static_hosts.clone(),
            api_prefix: config.api_prefix.clone(),
            api_patterns: config.api_patterns.clone(),
        }
    }
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

/// Compiled classifier.
#[derive(Debug, Clone)]
pub struct Classifier {
    shell_files: HashSet<String>,
    static_extensions: Vec<String>,
    image_extensions: Vec<String>,
    static_hosts: HashSet<String>,
    api_prefix: String,
    api_patterns: Vec<Regex>,
}

/// The parts of a URL the rules look at.
struct UrlParts {
    full: String,
    host: Option<String>,
    path: String,
}

impl UrlParts {
    fn of(input: &str) -> Self {
        match url::Url::parse(input.trim()) {
            Ok(mut parsed) => {
                parsed.set_fragment(None);
                Self {
                    host: parsed.host_str().map(str::to_ascii_lowercase),
                    path: parsed.path().to_ascii_lowercase(),
                    full: parsed.into(),
                }
            }
            // Relative or malformed: classify on the raw string.
            Err(_) => {
                let full = input.trim().split('#').next().unwrap_or_default().to_string();
                let path = full.split('?').next().unwrap_or_default().to_ascii_lowercase();
                Self { full, host: None, path }
            }
        }
    }
}

impl Classifier {
    /// Compile the rules. Relative shell files resolve against `origin`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if an API pattern is not a valid regex
    /// and `Error::InvalidUrl` if a shell file cannot be resolved.
    pub fn new(rules: &ClassifierRules, origin: &url::Url) -> Result<Self, Error> {
        let shell_files = rules
            .shell_files
            .iter()
            .map(|file| {
                resolve(origin, file)
                    .map(String::from)
                    .map_err(|e| Error::InvalidUrl(format!("{file}: {e}")))
            })
            .collect::<Result<HashSet<_>, _>>()?;

        let api_patterns = rules
            .api_patterns
            .iter()
            .map(|p| Regex::new(p).map_err(|e| Error::InvalidInput(format!("invalid api pattern {p:?}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;

        let lower = |v: &[String]| v.iter().map(|s| s.to_ascii_lowercase()).collect::<Vec<_>>();

        Ok(Self {
            shell_files,
            static_extensions: lower(&rules.static_extensions),
            image_extensions: lower(&rules.image_extensions),
            static_hosts: rules.static_hosts.iter().map(|h| h.to_ascii_lowercase()).collect(),
            api_prefix: rules.api_prefix.clone(),
            api_patterns,
        })
    }

    pub fn is_image(&self, url: &str) -> bool {
        let parts = UrlParts::of(url);
        self.image_extensions.iter().any(|ext| parts.path.ends_with(ext))
    }

    pub fn is_static(&self, url: &str) -> bool {
        let parts = UrlParts::of(url);
        self.shell_files.contains(&parts.full)
            || self.static_extensions.iter().any(|ext| parts.path.ends_with(ext))
            || parts.host.is_some_and(|h| self.static_hosts.contains(&h))
    }

    pub fn is_api(&self, url: &str) -> bool {
        let parts = UrlParts::of(url);
        (!self.api_prefix.is_empty() && parts.path.starts_with(&self.api_prefix))
            || self.api_patterns.iter().any(|re| re.is_match(&parts.path))
    }

    /// Categorize a URL. Total: never fails.
    pub fn classify(&self, url: &str) -> Category {
        if self.is_image(url) {
            Category::Image
        } else if self.is_static(url) {
            Category::Static
        } else if self.is_api(url) {
            Category::Api
        } else {
            Category::Other
        }
    }

    pub fn classify_request(&self, url: impl Into<String>) -> ClassifiedRequest {
        let url = url.into();
        let category = self.classify(&url);
        ClassifiedRequest { url, category }
    }
}
