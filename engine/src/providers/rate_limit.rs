//! Rate-limit window store.

use super::VersionedStore;
use crate::error::Result;
use crate::model::{RateLimitState, UserId};
use std::future::Future;

/// Store key for a (player, action) window.
#[must_use]
pub fn rate_limit_key(user_id: &UserId, action: &str) -> String {
    format!("{user_id}:{action}")
}

/// Sliding-window state per (player, action).
///
/// Live checks go through [`VersionedStore`]. Maintenance only ever deletes.
pub trait RateLimitStore: VersionedStore<RateLimitState> {
    /// Delete one window (admin override).
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot be reached.
    fn delete(&self, key: &str) -> impl Future<Output = Result<()>> + Send;

    /// Delete every window whose `last_attempt` is strictly before `cutoff_millis`.
    ///
    /// Returns how many windows were removed. A window touched after the
    /// cutoff must survive even if it was stale when the scan began.
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot be reached.
    fn prune_stale(&self, cutoff_millis: i64) -> impl Future<Output = Result<usize>> + Send;
}
