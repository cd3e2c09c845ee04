//! Server configuration.
//!
//! Every setting comes from a `GEOGUARD_*` environment variable (a `.env`
//! file is honoured) and falls back to a default suitable for local runs.

use geoguard_engine::config::ServiceConfig;
use geoguard_engine::{EngineConfig, MaintenanceConfig};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Where engine state lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process-local maps. State is lost on restart.
    Memory,
    /// Shared Redis instance.
    Redis,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(format!("unknown storage backend '{other}'")),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_filter: String,
    /// Metrics server host (for Prometheus scraping)
    pub metrics_host: String,
    /// Metrics server port
    pub metrics_port: u16,
}

/// Store settings.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Selected backend
    pub backend: StorageBackend,
    /// Redis connection URL
    pub redis_url: String,
    /// Key prefix for every Redis key
    pub namespace: String,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listener
    pub server: ServerConfig,
    /// Store backend
    pub storage: StorageConfig,
    /// Budget for one engine call, retries included
    pub call_timeout: Duration,
    /// Rate-limit pruning schedule
    pub maintenance: MaintenanceConfig,
}

impl Config {
    /// Load configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Unparseable values fall back to their default with a warning.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let defaults = MaintenanceConfig::default();

        Self {
            server: ServerConfig {
                host: string("GEOGUARD_HOST", "0.0.0.0"),
                port: parsed(&lookup, "GEOGUARD_PORT").unwrap_or(8080),
                log_filter: string("GEOGUARD_LOG", "geoguard=info,tower_http=info"),
                metrics_host: string("GEOGUARD_METRICS_HOST", "0.0.0.0"),
                metrics_port: parsed(&lookup, "GEOGUARD_METRICS_PORT").unwrap_or(9090),
            },
            storage: StorageConfig {
                backend: parsed(&lookup, "GEOGUARD_STORAGE").unwrap_or(StorageBackend::Memory),
                redis_url: string("GEOGUARD_REDIS_URL", "redis://127.0.0.1:6379"),
                namespace: string("GEOGUARD_NAMESPACE", "geoguard"),
            },
            call_timeout: parsed(&lookup, "GEOGUARD_CALL_TIMEOUT_MS")
                .map_or(ServiceConfig::default().call_timeout, Duration::from_millis),
            maintenance: MaintenanceConfig::new(
                parsed(&lookup, "GEOGUARD_RATE_LIMIT_RETENTION_SECS")
                    .map_or(defaults.retention, Duration::from_secs),
                parsed(&lookup, "GEOGUARD_MAINTENANCE_INTERVAL_SECS")
                    .map_or(defaults.interval, Duration::from_secs),
            ),
        }
    }

    /// Engine configuration with this server's call budget.
    #[must_use]
    pub fn engine(&self) -> EngineConfig {
        EngineConfig::default()
            .with_service(ServiceConfig::default().with_call_timeout(self.call_timeout))
    }

    /// Address for the public API.
    #[must_use]
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Address for the Prometheus scrape endpoint.
    #[must_use]
    pub fn metrics_addr(&self) -> String {
        format!("{}:{}", self.server.metrics_host, self.server.metrics_port)
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    let value = raw.trim().parse().ok();
    if value.is_none() {
        tracing::warn!(key, value = %raw, "Ignoring unparseable setting");
    }
    value
}
