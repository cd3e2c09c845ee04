//! In-memory suspicious activity store.

use super::store::OutageSwitch;
use crate::error::{EngineError, Result};
use crate::model::{ActivityId, Review, SuspiciousActivity, UserId};
use crate::providers::ActivityStore;
use std::sync::{Arc, Mutex};

/// In-memory [`ActivityStore`]. Keeps records in insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryActivityStore {
    activities: Arc<Mutex<Vec<SuspiciousActivity>>>,
    outage: OutageSwitch,
}

impl InMemoryActivityStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store controlled by `outage`.
    #[must_use]
    pub fn with_outage(outage: OutageSwitch) -> Self {
        Self {
            activities: Arc::new(Mutex::new(Vec::new())),
            outage,
        }
    }

    /// Snapshot of every stored record.
    #[must_use]
    pub fn all(&self) -> Vec<SuspiciousActivity> {
        self.activities
            .lock()
            .map(|activities| activities.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<SuspiciousActivity>>> {
        self.activities
            .lock()
            .map_err(|_| EngineError::Internal("Mutex lock failed".into()))
    }
}

impl ActivityStore for InMemoryActivityStore {
    async fn insert(&self, activity: SuspiciousActivity) -> Result<()> {
        self.outage.check().await?;
        self.lock()?.push(activity);
        Ok(())
    }

    async fn get(&self, id: &ActivityId) -> Result<Option<SuspiciousActivity>> {
        self.outage.check().await?;
        Ok(self.lock()?.iter().find(|activity| &activity.id == id).cloned())
    }

    async fn list_pending(&self, limit: usize) -> Result<Vec<SuspiciousActivity>> {
        self.outage.check().await?;
        Ok(self
            .lock()?
            .iter()
            .filter(|activity| !activity.reviewed)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<SuspiciousActivity>> {
        self.outage.check().await?;
        Ok(self
            .lock()?
            .iter()
            .filter(|activity| &activity.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn mark_reviewed(&self, id: &ActivityId, review: &Review) -> Result<SuspiciousActivity> {
        self.outage.check().await?;
        let mut activities = self.lock()?;

        let activity = activities
            .iter_mut()
            .find(|activity| &activity.id == id)
            .ok_or_else(|| EngineError::ActivityNotFound(id.to_string()))?;

        if activity.reviewed {
            return Err(EngineError::AlreadyReviewed(id.to_string()));
        }

        activity.apply_review(review);
        Ok(activity.clone())
    }
}
