//! Redis-backed stores.
//!
//! # Layout
//!
//! Per-player entities are hashes:
//! - **Entity**: `{namespace}:{key}` → `version`, `value` (JSON)
//!
//! Rate-limit windows additionally keep:
//! - **Staleness index**: `{namespace}:index` (sorted set, score = `last_attempt` ms)
//!
//! Suspicious activities are hashes plus two indexes:
//! - **Record**: `{namespace}:{id}` → `data` (JSON, immutable), `review` (JSON, set once)
//! - **Pending queue**: `{namespace}:pending` (sorted set, score = `created_at` ms)
//! - **Per player**: `{namespace}:user:{user_id}` (sorted set, score = `created_at` ms)
//!
//! Every write that must be atomic runs as a single Lua script or an atomic
//! pipeline. Any Redis failure surfaces as `EngineError::StoreUnavailable`.
//!
//! # Example
//!
//! ```no_run
//! use geoguard_engine::stores::{connect, RedisStore};
//! use geoguard_engine::model::UserTrustScore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let conn = connect("redis://127.0.0.1:6379").await?;
//! let trust_scores: RedisStore<UserTrustScore> = RedisStore::new(conn, "geoguard:trust");
//! # Ok(())
//! # }
//! ```

use crate::error::{EngineError, Result};
use crate::model::{ActivityId, RateLimitState, Review, SuspiciousActivity, UserId};
use crate::providers::{ActivityStore, RateLimitStore, Versioned, VersionedStore};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// Windows deleted per prune script invocation.
const PRUNE_BATCH: usize = 500;

/// Swap `version`/`value` iff the stored version matches `ARGV[1]`
/// (empty string: only if absent). Optionally indexes the key in `KEYS[2]`.
const COMPARE_AND_SWAP: &str = r"
    local current = redis.call('HGET', KEYS[1], 'version')
    if ARGV[1] == '' then
        if current then return 0 end
    elseif current ~= ARGV[1] then
        return 0
    end
    redis.call('HSET', KEYS[1], 'version', ARGV[2], 'value', ARGV[3])
    if ARGV[4] then
        redis.call('ZADD', KEYS[2], ARGV[4], ARGV[5])
    end
    return 1
";

/// Delete up to `ARGV[2]` indexed entities scored strictly below `ARGV[1]`.
const PRUNE_STALE: &str = r"
    local stale = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', '(' .. ARGV[1], 'LIMIT', 0, ARGV[2])
    for _, member in ipairs(stale) do
        redis.call('DEL', ARGV[3] .. member)
        redis.call('ZREM', KEYS[1], member)
    end
    return #stale
";

/// Set the review once. -1: no such record, 0: already reviewed, 1: applied.
const MARK_REVIEWED: &str = r"
    if redis.call('EXISTS', KEYS[1]) == 0 then return -1 end
    if redis.call('HSETNX', KEYS[1], 'review', ARGV[1]) == 0 then return 0 end
    redis.call('ZREM', KEYS[2], ARGV[2])
    return 1
";

fn unavailable(context: &str, err: &redis::RedisError) -> EngineError {
    EngineError::StoreUnavailable(format!("{context}: {err}"))
}

/// Open a managed, auto-reconnecting connection.
///
/// # Errors
///
/// Returns `EngineError::StoreUnavailable` if the URL is invalid or Redis
/// cannot be reached.
pub async fn connect(redis_url: &str) -> Result<ConnectionManager> {
    let client = Client::open(redis_url).map_err(|e| unavailable("Failed to create Redis client", &e))?;

    ConnectionManager::new(client)
        .await
        .map_err(|e| unavailable("Failed to create Redis connection manager", &e))
}

// ═══════════════════════════════════════════════════════════
// Versioned entities
// ═══════════════════════════════════════════════════════════

/// [`VersionedStore`] over Redis hashes.
pub struct RedisStore<V> {
    conn_manager: ConnectionManager,
    namespace: String,
    cas: Script,
    _value: PhantomData<fn() -> V>,
}

impl<V> Clone for RedisStore<V> {
    fn clone(&self) -> Self {
        Self {
            conn_manager: self.conn_manager.clone(),
            namespace: self.namespace.clone(),
            cas: self.cas.clone(),
            _value: PhantomData,
        }
    }
}

impl<V> RedisStore<V>
where
    V: Serialize + DeserializeOwned + Send + Sync,
{
    /// Create a store whose keys live under `namespace`.
    #[must_use]
    pub fn new(conn_manager: ConnectionManager, namespace: impl Into<String>) -> Self {
        Self {
            conn_manager,
            namespace: namespace.into(),
            cas: Script::new(COMPARE_AND_SWAP),
            _value: PhantomData,
        }
    }

    fn entity_key(&self, key: &str) -> String {
        format!("{}:{key}", self.namespace)
    }

    fn index_key(&self) -> String {
        format!("{}:index", self.namespace)
    }

    async fn fetch(&self, key: &str) -> Result<Option<Versioned<V>>> {
        let mut conn = self.conn_manager.clone();

        let (version, value): (Option<u64>, Option<String>) = redis::cmd("HMGET")
            .arg(self.entity_key(key))
            .arg("version")
            .arg("value")
            .query_async(&mut conn)
            .await
            .map_err(|e| unavailable("Failed to load entity", &e))?;

        match (version, value) {
            (Some(version), Some(value)) => Ok(Some(Versioned {
                value: serde_json::from_str(&value)?,
                version,
            })),
            _ => Ok(None),
        }
    }

    /// Swap, optionally recording `index_score` for `key` in the staleness index.
    async fn swap(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: &V,
        index_score: Option<i64>,
    ) -> Result<bool> {
        let mut conn = self.conn_manager.clone();
        let encoded = serde_json::to_string(value)?;
        let next_version = expected_version.map_or(1, |version| version + 1);

        let mut invocation = self.cas.prepare_invoke();
        invocation
            .key(self.entity_key(key))
            .key(self.index_key())
            .arg(expected_version.map(|v| v.to_string()).unwrap_or_default())
            .arg(next_version)
            .arg(encoded);
        if let Some(score) = index_score {
            invocation.arg(score).arg(key);
        }

        let swapped: i64 = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(|e| unavailable("Failed to compare-and-swap entity", &e))?;

        Ok(swapped == 1)
    }
}

impl<V> VersionedStore<V> for RedisStore<V>
where
    V: Serialize + DeserializeOwned + Send + Sync,
{
    async fn load(&self, key: &str) -> Result<Option<Versioned<V>>> {
        self.fetch(key).await
    }

    async fn compare_and_swap(&self, key: &str, expected_version: Option<u64>, value: V) -> Result<bool> {
        self.swap(key, expected_version, &value, None).await
    }
}

// ═══════════════════════════════════════════════════════════
// Rate-limit windows
// ═══════════════════════════════════════════════════════════

/// [`RateLimitStore`] over Redis.
///
/// Each swap also scores the window by `last_attempt` in the staleness
/// index, in the same script, so pruning never needs `SCAN`.
#[derive(Clone)]
pub struct RedisRateLimitStore {
    inner: RedisStore<RateLimitState>,
    prune: Script,
}

impl RedisRateLimitStore {
    /// Create a store whose keys live under `namespace`.
    #[must_use]
    pub fn new(conn_manager: ConnectionManager, namespace: impl Into<String>) -> Self {
        Self {
            inner: RedisStore::new(conn_manager, namespace),
            prune: Script::new(PRUNE_STALE),
        }
    }
}

impl VersionedStore<RateLimitState> for RedisRateLimitStore {
    async fn load(&self, key: &str) -> Result<Option<Versioned<RateLimitState>>> {
        self.inner.fetch(key).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: RateLimitState,
    ) -> Result<bool> {
        let score = value.last_attempt;
        self.inner.swap(key, expected_version, &value, Some(score)).await
    }
}

impl RateLimitStore for RedisRateLimitStore {
    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.inner.conn_manager.clone();

        let _: () = redis::pipe()
            .atomic()
            .del(self.inner.entity_key(key))
            .ignore()
            .zrem(self.inner.index_key(), key)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| unavailable("Failed to delete rate-limit window", &e))?;

        Ok(())
    }

    async fn prune_stale(&self, cutoff_millis: i64) -> Result<usize> {
        let mut conn = self.inner.conn_manager.clone();
        let entity_prefix = format!("{}:", self.inner.namespace);
        let mut removed = 0;

        loop {
            let batch: usize = self
                .prune
                .key(self.inner.index_key())
                .arg(cutoff_millis)
                .arg(PRUNE_BATCH)
                .arg(&entity_prefix)
                .invoke_async(&mut conn)
                .await
                .map_err(|e| unavailable("Failed to prune rate-limit windows", &e))?;

            removed += batch;
            if batch < PRUNE_BATCH {
                break;
            }
        }

        Ok(removed)
    }
}

// ═══════════════════════════════════════════════════════════
// Suspicious activities
// ═══════════════════════════════════════════════════════════

/// [`ActivityStore`] over Redis.
#[derive(Clone)]
pub struct RedisActivityStore {
    conn_manager: ConnectionManager,
    namespace: String,
    mark: Script,
}

impl RedisActivityStore {
    /// Create a store whose keys live under `namespace`.
    #[must_use]
    pub fn new(conn_manager: ConnectionManager, namespace: impl Into<String>) -> Self {
        Self {
            conn_manager,
            namespace: namespace.into(),
            mark: Script::new(MARK_REVIEWED),
        }
    }

    fn record_key(&self, id: &str) -> String {
        format!("{}:{id}", self.namespace)
    }

    fn pending_key(&self) -> String {
        format!("{}:pending", self.namespace)
    }

    fn user_key(&self, user_id: &UserId) -> String {
        format!("{}:user:{user_id}", self.namespace)
    }

    fn decode(data: &str, review: Option<&str>) -> Result<SuspiciousActivity> {
        let mut activity: SuspiciousActivity = serde_json::from_str(data)?;
        if let Some(review) = review {
            let review: Review = serde_json::from_str(review)?;
            activity.apply_review(&review);
        }
        Ok(activity)
    }

    /// Load records in `ids` order, skipping ids whose record is gone.
    async fn fetch_many(&self, ids: &[String]) -> Result<Vec<SuspiciousActivity>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.conn_manager.clone();
        let mut pipe = redis::pipe();
        for id in ids {
            pipe.cmd("HMGET").arg(self.record_key(id)).arg("data").arg("review");
        }

        let rows: Vec<(Option<String>, Option<String>)> = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| unavailable("Failed to load suspicious activities", &e))?;

        rows.into_iter()
            .filter_map(|(data, review)| data.map(|data| Self::decode(&data, review.as_deref())))
            .collect()
    }
}

impl ActivityStore for RedisActivityStore {
    async fn insert(&self, activity: SuspiciousActivity) -> Result<()> {
        let mut conn = self.conn_manager.clone();
        let data = serde_json::to_string(&activity)?;
        let created_at = activity.created_at.timestamp_millis();
        let id = activity.id.as_str();

        let _: () = redis::pipe()
            .atomic()
            .hset(self.record_key(id), "data", data)
            .ignore()
            .zadd(self.pending_key(), id, created_at)
            .ignore()
            .zadd(self.user_key(&activity.user_id), id, created_at)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| unavailable("Failed to insert suspicious activity", &e))?;

        Ok(())
    }

    async fn get(&self, id: &ActivityId) -> Result<Option<SuspiciousActivity>> {
        Ok(self.fetch_many(&[id.as_str().to_string()]).await?.into_iter().next())
    }

    async fn list_pending(&self, limit: usize) -> Result<Vec<SuspiciousActivity>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.conn_manager.clone();
        let stop = isize::try_from(limit).unwrap_or(isize::MAX) - 1;
        let ids: Vec<String> = conn
            .zrange(self.pending_key(), 0, stop)
            .await
            .map_err(|e| unavailable("Failed to read pending queue", &e))?;

        self.fetch_many(&ids).await
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<SuspiciousActivity>> {
        let mut conn = self.conn_manager.clone();
        let ids: Vec<String> = conn
            .zrange(self.user_key(user_id), 0, -1)
            .await
            .map_err(|e| unavailable("Failed to read player activity index", &e))?;

        self.fetch_many(&ids).await
    }

    async fn mark_reviewed(&self, id: &ActivityId, review: &Review) -> Result<SuspiciousActivity> {
        let mut conn = self.conn_manager.clone();
        let encoded = serde_json::to_string(review)?;

        let outcome: i64 = self
            .mark
            .key(self.record_key(id.as_str()))
            .key(self.pending_key())
            .arg(encoded)
            .arg(id.as_str())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| unavailable("Failed to mark activity reviewed", &e))?;

        match outcome {
            -1 => Err(EngineError::ActivityNotFound(id.to_string())),
            0 => Err(EngineError::AlreadyReviewed(id.to_string())),
            _ => self
                .get(id)
                .await?
                .ok_or_else(|| EngineError::ActivityNotFound(id.to_string())),
        }
    }
}
