//! Production store implementations.
//!
//! - [`RedisStore`]: versioned hashes with Lua compare-and-swap
//! - [`RedisRateLimitStore`]: rate-limit windows plus a staleness index
//! - [`RedisActivityStore`]: evidence records plus pending and per-player indexes

pub mod redis;

pub use self::redis::{connect, RedisActivityStore, RedisRateLimitStore, RedisStore};

use crate::config::EngineConfig;
use crate::environment::GuardEnvironment;
use crate::error::Result;
use crate::model::{AccountRecord, UserLocationHistory, UserTrustScore};
use geoguard_core::environment::Clock;
use std::sync::Arc;

/// Environment backed by Redis.
pub type RedisEnvironment = GuardEnvironment<
    RedisStore<UserLocationHistory>,
    RedisStore<UserTrustScore>,
    RedisRateLimitStore,
    RedisActivityStore,
    RedisStore<AccountRecord>,
>;

impl RedisEnvironment {
    /// Connect every store to `redis_url`, keys prefixed with `namespace`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::StoreUnavailable` if Redis cannot be reached.
    pub async fn redis(
        redis_url: &str,
        namespace: &str,
        config: EngineConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let conn = connect(redis_url).await?;

        tracing::info!(namespace, "Connected anti-cheat stores to Redis");

        Ok(Self::new(
            RedisStore::new(conn.clone(), format!("{namespace}:history")),
            RedisStore::new(conn.clone(), format!("{namespace}:trust")),
            RedisRateLimitStore::new(conn.clone(), format!("{namespace}:ratelimit")),
            RedisActivityStore::new(conn.clone(), format!("{namespace}:activity")),
            RedisStore::new(conn, format!("{namespace}:account")),
            clock,
            Arc::new(config),
        ))
    }
}
