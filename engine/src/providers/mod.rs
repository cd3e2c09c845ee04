//! Persistent store interfaces.
//!
//! The validation, scoring and enforcement logic depends only on these
//! traits. The `mocks` module provides in-memory implementations for tests
//! and local development; the `stores` module provides Redis.
//!
//! # Concurrency
//!
//! Every per-player entity is read and written through [`VersionedStore`]:
//!
//! ```text
//! load(key) ──► Versioned { value, version }
//!                   │
//!                   ▼  pure mutation
//! compare_and_swap(key, expected = version, new value)
//!                   │
//!        ┌──────────┴──────────┐
//!     swapped               version moved
//!        │                     │
//!      done           reload and try again
//! ```
//!
//! Two concurrent reports for one player therefore never both "win"; the
//! loser re-reads the winner's write and reapplies its mutation on top.

use crate::error::{EngineError, Result};
use crate::model::{AccountRecord, UserLocationHistory, UserTrustScore};
use std::future::Future;

pub mod activity;
pub mod rate_limit;

pub use activity::ActivityStore;
pub use rate_limit::{rate_limit_key, RateLimitStore};

/// A stored value together with its optimistic-concurrency version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    /// Stored value.
    pub value: T,
    /// Monotonic version, bumped on every successful swap.
    pub version: u64,
}

/// Keyed store with compare-and-swap writes.
pub trait VersionedStore<V>: Send + Sync {
    /// Load the current value and version.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::StoreUnavailable` if the backend cannot be reached
    /// and `EngineError::Serialization` if the stored value is corrupt.
    fn load(&self, key: &str) -> impl Future<Output = Result<Option<Versioned<V>>>> + Send;

    /// Write `value` iff the stored version still equals `expected_version`.
    ///
    /// `None` means "only if absent". Returns `false` when another writer got
    /// there first.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::StoreUnavailable` if the backend cannot be reached.
    fn compare_and_swap(
        &self,
        key: &str,
        expected_version: Option<u64>,
        value: V,
    ) -> impl Future<Output = Result<bool>> + Send;
}

/// Per-player location histories.
pub trait LocationHistoryStore: VersionedStore<UserLocationHistory> {}
impl<S: VersionedStore<UserLocationHistory>> LocationHistoryStore for S {}

/// Per-player trust scores.
pub trait TrustScoreStore: VersionedStore<UserTrustScore> {}
impl<S: VersionedStore<UserTrustScore>> TrustScoreStore for S {}

/// Per-player account restriction fields.
pub trait AccountStore: VersionedStore<AccountRecord> {}
impl<S: VersionedStore<AccountRecord>> AccountStore for S {}

/// Optimistic read-modify-write.
///
/// `mutate` receives the current value (or `None` if absent) and returns the
/// value to write plus an output. Returning `None` as the value skips the
/// write. The closure may run more than once and must not have side effects.
///
/// # Errors
///
/// Propagates store errors, and returns `EngineError::Conflict` when every
/// one of `max_attempts` swaps lost a race.
pub async fn update_versioned<V, S, R, F>(
    store: &S,
    key: &str,
    max_attempts: usize,
    mut mutate: F,
) -> Result<R>
where
    S: VersionedStore<V> + ?Sized,
    F: FnMut(Option<V>) -> (Option<V>, R),
{
    for attempt in 1..=max_attempts.max(1) {
        let current = store.load(key).await?;
        let expected_version = current.as_ref().map(|stored| stored.version);
        let (next, output) = mutate(current.map(|stored| stored.value));

        let Some(next) = next else {
            return Ok(output);
        };

        if store.compare_and_swap(key, expected_version, next).await? {
            return Ok(output);
        }

        tracing::debug!(key = %key, attempt, "Optimistic update lost a race, retrying");
    }

    tracing::warn!(key = %key, max_attempts, "Optimistic update gave up after repeated conflicts");
    Err(EngineError::Conflict {
        key: key.to_string(),
    })
}
