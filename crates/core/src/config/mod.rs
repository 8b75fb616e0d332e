//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (TALLY_SW_*)
//! 2. TOML config file (if TALLY_SW_CONFIG_FILE set)
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
/// 1. Environment variables (TALLY_SW_*)
/// 2. TOML config file (if TALLY_SW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Origin of the application the worker controls (scheme, host, port).
    ///
    /// Set via TALLY_SW_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Prefix of every bucket name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Deployment version embedded in the current bucket name.
    ///
    /// Bumping it invalidates every previously cached entry on the next activate.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// URLs fetched and stored during install. Paths resolve against `origin`.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Path to SQLite cache database.
    ///
    /// Set via TALLY_SW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to read per response.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP client request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Deadline for the network attempt of Network-First before falling back to the cache.
    #[serde(default = "default_network_timeout_ms")]
    pub network_timeout_ms: u64,

    /// Total body bytes the cache may hold across all buckets.
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: u64,

    /// Background sync tag acknowledged by the worker.
    #[serde(default = "default_sync_tag")]
    pub sync_tag: String,

    /// Notification title used when a push payload has none.
    #[serde(default = "default_app_name")]
    pub app_name: String,

    #[serde(default = "default_notification_icon")]
    pub notification_icon: String,

    #[serde(default = "default_notification_badge")]
    pub notification_badge: String,

    /// Vibration pattern in milliseconds (vibrate, pause, vibrate, ...).
    #[serde(default = "default_vibrate_pattern")]
    pub vibrate_pattern: Vec<u32>,

    /// `primaryKey` attached to notifications whose payload has none.
    #[serde(default = "default_primary_key")]
    pub default_primary_key: String,
}

fn default_origin() -> String {
    "http://localhost:5173".into()
}

fn default_cache_prefix() -> String {
    "expense-tracker".into()
}

fn default_cache_version() -> String {
    "v1.0.0".into()
}

fn default_precache() -> Vec<String> {
    vec![
        "/".into(),
        "/manifest.json".into(),
        "/icons/icon-192x192.png".into(),
        "/icons/icon-512x512.png".into(),
        "/src/main.jsx".into(),
        "/src/index.css".into(),
        "https://fonts.googleapis.com/css2?family=Inter:wght@300;400;500;600;700&display=swap".into(),
    ]
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./tally-sw-cache.sqlite")
}

fn default_user_agent() -> String {
    "tally-sw/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_network_timeout_ms() -> u64 {
    10_000
}

fn default_quota_bytes() -> u64 {
    52_428_800 // 50MB
}

fn default_sync_tag() -> String {
    "sync-expenses".into()
}

fn default_app_name() -> String {
    "Expense Tracker".into()
}

fn default_notification_icon() -> String {
    "/icons/icon-192x192.png".into()
}

fn default_notification_badge() -> String {
    "/icons/icon-72x72.png".into()
}

fn default_vibrate_pattern() -> Vec<u32> {
    vec![100, 50, 100]
}

fn default_primary_key() -> String {
    "1".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            precache: default_precache(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            network_timeout_ms: default_network_timeout_ms(),
            quota_bytes: default_quota_bytes(),
            sync_tag: default_sync_tag(),
            app_name: default_app_name(),
            notification_icon: default_notification_icon(),
            notification_badge: default_notification_badge(),
            vibrate_pattern: default_vibrate_pattern(),
            default_primary_key: default_primary_key(),
        }
    }
}

impl AppConfig {
    /// Name of the current bucket: `{cache_prefix}-{cache_version}`.
    pub fn cache_name(&self) -> String {
        format!("{}-{}", self.cache_prefix, self.cache_version)
    }

    /// HTTP client timeout as Duration for use with reqwest.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Network-First deadline as Duration.
    pub fn network_timeout(&self) -> Duration {
        Duration::from_millis(self.network_timeout_ms)
    }

    /// Parsed application origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if `origin` is not an absolute URL.
    pub fn origin_url(&self) -> Result<url::Url, ConfigError> {
        url::Url::parse(self.origin.trim())
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `TALLY_SW_`
    /// 2. TOML file from `TALLY_SW_CONFIG_FILE` (if set)
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

        if let Ok(config_path) = std::env::var("TALLY_SW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("TALLY_SW_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
