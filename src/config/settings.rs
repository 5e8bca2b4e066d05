//! Environment-driven application settings.
//!
//! Every value has a fallback so the store can start with nothing configured;
//! a missing server simply means offline mode.

use std::{path::PathBuf, time::Duration};

use thiserror::Error;

use crate::config::timeouts::{
    DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_RECONCILE_INTERVAL_MS, MIN_RECONCILE_INTERVAL_MS,
};

pub const ENV_SERVER: &str = "POOLMAP_SERVER";
pub const ENV_MAP_TOKEN: &str = "POOLMAP_MAP_TOKEN";
pub const ENV_POLYGONS: &str = "POOLMAP_POLYGONS";
pub const ENV_POOLS: &str = "POOLMAP_POOLS";
pub const ENV_RECONCILE_MS: &str = "POOLMAP_RECONCILE_MS";
pub const ENV_HTTP_TIMEOUT_MS: &str = "POOLMAP_HTTP_TIMEOUT_MS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("E-POOL-0301: server endpoint '{0}' is not an absolute http(s) url")]
    Server(String),
    #[error("E-POOL-0302: reconcile interval {0}ms is below the {}ms floor", MIN_RECONCILE_INTERVAL_MS)]
    Interval(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Raw batches server endpoint as supplied; normalized on read by the store.
    pub server: Option<String>,
    pub map_token: Option<String>,
    pub polygons_path: Option<PathBuf>,
    pub pools_path: Option<PathBuf>,
    pub reconcile_interval_ms: u64,
    pub http_timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: None,
            map_token: None,
            polygons_path: None,
            pools_path: None,
            reconcile_interval_ms: DEFAULT_RECONCILE_INTERVAL_MS,
            http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - POOLMAP_SERVER: batches server base url (absent: offline mode)
    /// - POOLMAP_MAP_TOKEN: map tile auth token
    /// - POOLMAP_POLYGONS / POOLMAP_POOLS: bundled catalog files
    /// - POOLMAP_RECONCILE_MS: reconciliation period (default: 5000)
    /// - POOLMAP_HTTP_TIMEOUT_MS: per-request timeout (default: 10000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let reconcile_interval_ms = non_empty(ENV_RECONCILE_MS)
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_RECONCILE_INTERVAL_MS);

        let http_timeout_ms = non_empty(ENV_HTTP_TIMEOUT_MS)
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_MS);

        let config = Self {
            server: non_empty(ENV_SERVER),
            map_token: non_empty(ENV_MAP_TOKEN),
            polygons_path: non_empty(ENV_POLYGONS).map(PathBuf::from),
            pools_path: non_empty(ENV_POOLS).map(PathBuf::from),
            reconcile_interval_ms,
            http_timeout_ms,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(server) = &self.server {
            let ok = url::Url::parse(server)
                .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
                .unwrap_or(false);
            if !ok {
                return Err(ConfigError::Server(server.clone()));
            }
        }
        if self.reconcile_interval_ms < MIN_RECONCILE_INTERVAL_MS {
            return Err(ConfigError::Interval(self.reconcile_interval_ms));
        }
        Ok(())
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.reconcile_interval_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// Human-readable summary for diagnostics. The map token is never printed.
    pub fn summary(&self) -> String {
        format!(
            "server={}, map_token={}, reconcile_ms={}, http_timeout_ms={}",
            self.server.as_deref().unwrap_or("<offline>"),
            if self.map_token.is_some() { "set" } else { "unset" },
            self.reconcile_interval_ms,
            self.http_timeout_ms,
        )
    }
}
