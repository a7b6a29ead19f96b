//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHELLCACHE_*)
//! 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SHELLCACHE_*)
/// 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Deployed worker version. Bumping it rotates both cache partitions.
    ///
    /// Set via SHELLCACHE_VERSION environment variable.
    #[serde(default = "default_version")]
    pub version: String,

    /// Prefix for partition names (`{prefix}-static-{version}`).
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Origin the application is served from; relative URLs resolve against it.
    ///
    /// Set via SHELLCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path to SQLite cache database.
    ///
    /// Set via SHELLCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Shell page served to navigations when offline.
    #[serde(default = "default_shell_page")]
    pub shell_page: String,

    /// Files cached at install, in order.
    #[serde(default = "default_shell_files")]
    pub shell_files: Vec<String>,

    #[serde(default = "default_static_extensions")]
    pub static_extensions: Vec<String>,

    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,

    /// External font/icon CDN hosts treated as static.
    #[serde(default = "default_static_hosts")]
    pub static_hosts: Vec<String>,

    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Regexes matched against the request path.
    #[serde(default = "default_api_patterns")]
    pub api_patterns: Vec<String>,

    /// Message placed in the offline JSON error for API requests.
    #[serde(default = "default_offline_message")]
    pub offline_message: String,

    /// Activate a freshly installed version without waiting for the page.
    ///
    /// Set via SHELLCACHE_AUTO_SKIP_WAITING environment variable.
    #[serde(default)]
    pub auto_skip_waiting: bool,

    #[serde(default)]
    pub notification: NotificationConfig,
}

/// Defaults for push notifications.
///
/// Set via SHELLCACHE_NOTIFICATION__* environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_notification_title")]
    pub title: String,

    /// Body used when the push carries no payload.
    #[serde(default = "default_notification_body")]
    pub body: String,

    #[serde(default = "default_notification_icon")]
    pub icon: String,

    #[serde(default = "default_notification_badge")]
    pub badge: String,

    /// Vibration pattern in milliseconds.
    #[serde(default = "default_vibrate")]
    pub vibrate: Vec<u32>,
}

fn default_version() -> String {
    "v1.0.0".into()
}

fn default_cache_prefix() -> String {
    "jarvis".into()
}

fn default_origin() -> String {
    "http://localhost:5000".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shellcache.sqlite")
}

fn default_user_agent() -> String {
    "shellcache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_shell_page() -> String {
    "/index.html".into()
}

fn default_shell_files() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/css/mobile.css",
        "/css/animations.css",
        "/js/mobile-app.js",
        "/js/voice-recognition.js",
        "/js/image-generation.js",
        "/js/whatsapp-integration.js",
        "/js/pwa-service.js",
        "/manifest.json",
        "/icons/icon-192x192.png",
        "/icons/icon-512x512.png",
        "/icons/apple-touch-icon.png",
        "https://fonts.googleapis.com/css2?family=Orbitron:wght@400;700;900&family=Roboto:wght@300;400;500&display=swap",
        "https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.0.0/css/all.min.css",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_static_extensions() -> Vec<String> {
    [".css", ".js", ".png", ".jpg", ".ico"].into_iter().map(String::from).collect()
}

fn default_image_extensions() -> Vec<String> {
    [".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg"].into_iter().map(String::from).collect()
}

fn default_static_hosts() -> Vec<String> {
    vec!["fonts.googleapis.com".into(), "cdnjs.cloudflare.com".into()]
}

fn default_api_prefix() -> String {
    "/api/".into()
}

fn default_api_patterns() -> Vec<String> {
    vec!["^/api/chat".into(), "^/api/status".into(), "^/api/health".into()]
}

fn default_offline_message() -> String {
    "This feature requires an internet connection".into()
}

fn default_notification_title() -> String {
    "J.A.R.V.I.S AI Assistant".into()
}

fn default_notification_body() -> String {
    "New message from J.A.R.V.I.S".into()
}

fn default_notification_icon() -> String {
    "/icons/icon-192x192.png".into()
}

fn default_notification_badge() -> String {
    "/icons/icon-72x72.png".into()
}

fn default_vibrate() -> Vec<u32> {
    vec![200, 100, 200]
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            title: default_notification_title(),
            body: default_notification_body(),
            icon: default_notification_icon(),
            badge: default_notification_badge(),
            vibrate: default_vibrate(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            cache_prefix: default_cache_prefix(),
            origin: default_origin(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            shell_page: default_shell_page(),
            shell_files: default_shell_files(),
            static_extensions: default_static_extensions(),
            image_extensions: default_image_extensions(),
            static_hosts: default_static_hosts(),
            api_prefix: default_api_prefix(),
            api_patterns: default_api_patterns(),
            offline_message: default_offline_message(),
            auto_skip_waiting: false,
            notification: NotificationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SHELLCACHE_`
    /// 2. TOML file from `SHELLCACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SHELLCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SHELLCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.version, "v1.0.0");
        assert_eq!(config.cache_prefix, "jarvis");
        assert_eq!(config.db_path, PathBuf::from("./shellcache.sqlite"));
        assert_eq!(config.user_agent, "shellcache/0.1");
        assert_eq!(config.max_bytes, 5_242_880);
        assert_eq!(config.timeout_ms, 20_000);
        assert_eq!(config.shell_page, "/index.html");
        assert_eq!(config.shell_files.len(), 15);
        assert_eq!(config.image_extensions.len(), 6);
        assert!(!config.auto_skip_waiting);
        assert_eq!(config.notification.vibrate, vec![200, 100, 200]);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_shell_files_include_cdn_assets() {
        let config = AppConfig::default();
        let external: Vec<_> = config.shell_files.iter().filter(|f| f.starts_with("https://")).collect();
        assert_eq!(external.len(), 2);
    }

    #[test]
    fn test_toml_layer_overrides_defaults() {
        let toml = r#"
            version = "v2"
            shell_files = ["/index.html", "/app.js"]

            [notification]
            title = "Assistant"
        "#;
        let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string(toml))
            .extract()
            .unwrap();

        assert_eq!(config.version, "v2");
        assert_eq!(config.shell_files, vec!["/index.html".to_string(), "/app.js".to_string()]);
        assert_eq!(config.notification.title, "Assistant");
        assert_eq!(config.notification.icon, "/icons/icon-192x192.png");
        assert_eq!(config.origin, "http://localhost:5000");
    }
}
