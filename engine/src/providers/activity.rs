//! Suspicious activity store.

use crate::error::Result;
use crate::model::{ActivityId, Review, SuspiciousActivity, UserId};
use std::future::Future;

/// Append-only evidence log plus its review queue.
///
/// Records are immutable except for the single unreviewed → reviewed
/// transition performed by [`ActivityStore::mark_reviewed`].
pub trait ActivityStore: Send + Sync {
    /// Append a new, unreviewed record.
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot be reached.
    fn insert(&self, activity: SuspiciousActivity) -> impl Future<Output = Result<()>> + Send;

    /// Fetch one record.
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot be reached.
    fn get(
        &self,
        id: &ActivityId,
    ) -> impl Future<Output = Result<Option<SuspiciousActivity>>> + Send;

    /// Unreviewed records, oldest first, at most `limit`.
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot be reached.
    fn list_pending(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<SuspiciousActivity>>> + Send;

    /// Every record about `user_id`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if the backend cannot be reached.
    fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> impl Future<Output = Result<Vec<SuspiciousActivity>>> + Send;

    /// Atomically apply `review` to an unreviewed record.
    ///
    /// Returns the updated record. Exactly one of several concurrent callers
    /// succeeds.
    ///
    /// # Errors
    ///
    /// - `EngineError::ActivityNotFound` if no record has this id
    /// - `EngineError::AlreadyReviewed` if the record was already reviewed
    /// - `EngineError::StoreUnavailable` if the backend cannot be reached
    fn mark_reviewed(
        &self,
        id: &ActivityId,
        review: &Review,
    ) -> impl Future<Output = Result<SuspiciousActivity>> + Send;
}
