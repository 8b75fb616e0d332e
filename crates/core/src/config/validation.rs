//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `cache_prefix` or `cache_version` is
    /// empty, and `ConfigError::Invalid` if:
    /// - `origin` is not an http(s) origin without path, query or fragment
    /// - a `precache` entry does not resolve against the origin
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` or `network_timeout_ms` is outside 100ms..=5 minutes
    /// - `quota_bytes` is 0
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        let origin = self.origin_url()?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", format!("unsupported scheme: {}", origin.scheme())));
        }
        if origin.path() != "/" || origin.query().is_some() || origin.fragment().is_some() {
            return Err(invalid("origin", "must not carry a path, query or fragment"));
        }

        if self.cache_prefix.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "cache_prefix".into(),
                hint: "Set TALLY_SW_CACHE_PREFIX environment variable".into(),
            });
        }
        if self.cache_version.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "cache_version".into(),
                hint: "Set TALLY_SW_CACHE_VERSION environment variable".into(),
            });
        }

        for entry in &self.precache {
            if entry.trim().is_empty() {
                return Err(invalid("precache", "entries must not be empty"));
            }
            let url = origin
                .join(entry.trim())
                .map_err(|e| invalid("precache", format!("{entry}: {e}")))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(invalid("precache", format!("{entry}: unsupported scheme: {}", url.scheme())));
            }
        }
        if self.precache.is_empty() {
            tracing::warn!("precache manifest is empty; offline navigation will have no shell");
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        for (field, value) in [("timeout_ms", self.timeout_ms), ("network_timeout_ms", self.network_timeout_ms)] {
            if value < 100 {
                return Err(invalid(field, "must be at least 100ms"));
            }
            if value > 300_000 {
                return Err(invalid(field, "must not exceed 5 minutes (300000ms)"));
            }
        }
        if self.network_timeout_ms > self.timeout_ms {
            tracing::warn!(
                network_timeout_ms = self.network_timeout_ms,
                timeout_ms = self.timeout_ms,
                "network_timeout_ms exceeds the HTTP client timeout; \
                 the client timeout fires first"
            );
        }

        if self.quota_bytes == 0 {
            return Err(invalid("quota_bytes", "must be greater than 0"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        Ok(())
    }
}
