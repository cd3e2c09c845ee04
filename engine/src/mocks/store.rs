//! In-memory versioned stores.

use crate::error::{EngineError, Result};
use crate::model::RateLimitState;
use crate::providers::{RateLimitStore, Versioned, VersionedStore};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared fault injector for in-memory stores.
///
/// Clones share state, so one switch handed to every store of an
/// environment simulates a whole-backend outage.
#[derive(Debug, Clone, Default)]
pub struct OutageSwitch {
    down: Arc<AtomicBool>,
    failures_remaining: Arc<AtomicUsize>,
    latency_millis: Arc<AtomicU64>,
    calls: Arc<AtomicUsize>,
}

impl OutageSwitch {
    /// Healthy switch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call until [`OutageSwitch::restore`].
    pub fn take_down(&self) {
        self.down.store(true, Ordering::SeqCst);
    }

    /// End an outage started with [`OutageSwitch::take_down`].
    pub fn restore(&self) {
        self.down.store(false, Ordering::SeqCst);
    }

    /// Fail only the next `count` calls.
    pub fn fail_next(&self, count: usize) {
        self.failures_remaining.store(count, Ordering::SeqCst);
    }

    /// Delay every call by `latency`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn set_latency(&self, latency: Duration) {
        self.latency_millis
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of store calls observed so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) async fn check(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let latency = self.latency_millis.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.down.load(Ordering::SeqCst) {
            return Err(EngineError::StoreUnavailable("in-memory store is down".into()));
        }

        let injected = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(EngineError::StoreUnavailable("injected failure".into()));
        }

        Ok(())
    }
}

/// In-memory [`VersionedStore`].
///
/// Versions start at 1 and increase by one per successful swap.
#[derive(Debug, Clone)]
pub struct InMemoryStore<V> {
    entries: Arc<Mutex<HashMap<String, Versioned<V>>>>,
    outage: OutageSwitch,
}

impl<V> InMemoryStore<V> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_outage(OutageSwitch::new())
    }

    /// Create an empty store controlled by `outage`.
    #[must_use]
    pub fn with_outage(outage: OutageSwitch) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            outage,
        }
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Versioned<V>>>> {
        self.entries
            .lock()
            .map_err(|_| EngineError::Internal("Mutex lock failed".into()))
    }
}

impl<V> Default for InMemoryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> VersionedStore<V> for InMemoryStore<V>
where
    V: Clone + Send + Sync,
{
    async fn load(&self, key: &str) -> Result<Option<Versioned<V>>> {
        self.outage.check().await?;
        Ok(self.lock()?.get(key).cloned())
    }

    async fn compare_and_swap(&self, key: &str, expected_version: Option<u64>, value: V) -> Result<bool> {
        self.outage.check().await?;
        let mut entries = self.lock()?;

        let current_version = entries.get(key).map(|stored| stored.version);
        if current_version != expected_version {
            tracing::debug!(
                key = %key,
                ?expected_version,
                ?current_version,
                "In-memory CAS rejected"
            );
            return Ok(false);
        }

        let version = current_version.map_or(1, |v| v + 1);
        entries.insert(key.to_string(), Versioned { value, version });
        Ok(true)
    }
}

/// In-memory [`RateLimitStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryRateLimitStore {
    inner: InMemoryStore<RateLimitState>,
}

impl InMemoryRateLimitStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store controlled by `outage`.
    #[must_use]
    pub fn with_outage(outage: OutageSwitch) -> Self {
        Self {
            inner: InMemoryStore::with_outage(outage),
        }
    }

    /// Number of stored windows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no windows are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl VersionedStore<RateLimitState> for InMemoryRateLimitStore {
    async fn load(&self, key: &str) -> Result<Option<Versioned<RateLimitState>>> {
        self.inner.load(key).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: RateLimitState,
    ) -> Result<bool> {
        self.inner.compare_and_swap(key, expected_version, value).await
    }
}

impl RateLimitStore for InMemoryRateLimitStore {
    async fn delete(&self, key: &str) -> Result<()> {
        self.inner.outage.check().await?;
        self.inner.lock()?.remove(key);
        Ok(())
    }

    async fn prune_stale(&self, cutoff_millis: i64) -> Result<usize> {
        self.inner.outage.check().await?;
        let mut entries = self.inner.lock()?;
        let before = entries.len();
        entries.retain(|_, stored| stored.value.last_attempt >= cutoff_millis);
        Ok(before - entries.len())
    }
}
