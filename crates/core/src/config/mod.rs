//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SHELLCACHE_*)
//! 2. TOML config file (if SHELLCACHE_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! One configuration describes one deployed build: the cache version and
//! app shell manifest are fixed for the lifetime of the process.

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
    /// Name of the cache store owned by this build.
    ///
    /// Set via SHELLCACHE_CACHE_VERSION. Changing it on a new deployment
    /// makes the next activation delete every other store.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Origin the application is served from (scheme, host, port).
    ///
    /// Set via SHELLCACHE_ORIGIN. Only same-origin static responses are cached.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Path of the application root, with a trailing slash.
    ///
    /// Set via SHELLCACHE_APP_ROOT.
    #[serde(default = "default_app_root")]
    pub app_root: String,

    /// Path under which the app shell document is cached.
    ///
    /// Set via SHELLCACHE_SHELL_INDEX.
    #[serde(default = "default_shell_index")]
    pub shell_index: String,

    /// URLs precached on install, in order.
    ///
    /// Set via SHELLCACHE_APP_SHELL (e.g. `["/app/", "/app/index.html"]`).
    #[serde(default = "default_app_shell")]
    pub app_shell: Vec<String>,

    /// Path to SQLite cache database.
    ///
    /// Set via SHELLCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    ///
    /// Set via SHELLCACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Largest response body, in bytes, that is written to the cache.
    /// Bigger responses are still served, just never stored.
    ///
    /// Set via SHELLCACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Network request timeout in milliseconds.
    ///
    /// Set via SHELLCACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_cache_version() -> String {
    "b-frame-v3.0".into()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_app_root() -> String {
    "/b-frame/".into()
}

fn default_shell_index() -> String {
    "/b-frame/index.html".into()
}

fn default_app_shell() -> Vec<String> {
    vec!["/b-frame/".into(), "/b-frame/index.html".into(), "/b-frame/manifest.webmanifest".into()]
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./shellcache.sqlite")
}

fn default_user_agent() -> String {
    "shellcache/0.1".into()
}

fn default_max_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_version: default_cache_version(),
            origin: default_origin(),
            app_root: default_app_root(),
            shell_index: default_shell_index(),
            app_shell: default_app_shell(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
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
