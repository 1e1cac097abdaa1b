//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use std::collections::HashSet;

use crate::config::AppConfig;
use thiserror::Error;
use url::Url;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_version` or `user_agent` is empty
    /// - `origin` is not a bare http(s) origin
    /// - `app_root` does not start and end with `/`, or `shell_index` is not an absolute path
    /// - `app_shell` is empty, contains blanks, or lists the same URL twice
    /// - `max_bytes` is 0 or exceeds 512MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_version.trim().is_empty() {
            return Err(invalid("cache_version", "must not be empty"));
        }

        let origin = Url::parse(&self.origin).map_err(|e| invalid("origin", e.to_string()))?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(invalid("origin", "scheme must be http or https"));
        }
        if origin.path() != "/" || origin.query().is_some() {
            return Err(invalid("origin", "must not contain a path or query"));
        }

        if !self.app_root.starts_with('/') || !self.app_root.ends_with('/') {
            return Err(invalid("app_root", "must start and end with '/'"));
        }

        if !self.shell_index.starts_with('/') {
            return Err(invalid("shell_index", "must be an absolute path"));
        }

        if self.app_shell.is_empty() {
            return Err(invalid("app_shell", "must list at least one URL"));
        }
        let mut seen = HashSet::new();
        for entry in &self.app_shell {
            if entry.trim().is_empty() {
                return Err(invalid("app_shell", "entries must not be empty"));
            }
            if !seen.insert(entry.as_str()) {
                return Err(invalid("app_shell", format!("duplicate entry {entry}")));
            }
        }

        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 512 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 512MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if self.user_agent.is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        if !self.app_shell.iter().any(|entry| entry.ends_with(&self.shell_index)) {
            tracing::warn!(
                shell_index = %self.shell_index,
                "shell_index is not part of app_shell; offline navigations fall back to 503 until it is cached"
            );
        }

        Ok(())
    }
}
