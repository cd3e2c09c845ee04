//! Suspicious activity log and admin review queue.

use crate::enforcement::EnforcementEngine;
use crate::environment::Environment;
use crate::error::Result;
use crate::model::{ActivityId, ActivityType, ReviewAction, Severity, SuspiciousActivity, UserId};
use crate::providers::ActivityStore;
use std::sync::Arc;

/// Evidence log.
///
/// [`SuspiciousActivityLog::record`] is the only write path for new
/// evidence. It is called by the validator and the rate limiter, never
/// directly on behalf of a client.
pub struct SuspiciousActivityLog<E: Environment> {
    env: Arc<E>,
}

impl<E: Environment> SuspiciousActivityLog<E> {
    /// Create a log over `env`.
    #[must_use]
    pub const fn new(env: Arc<E>) -> Self {
        Self { env }
    }

    /// Append a new unreviewed record.
    ///
    /// # Errors
    ///
    /// Returns error if the activity store is unavailable.
    pub async fn record(
        &self,
        user_id: &UserId,
        activity_type: ActivityType,
        severity: Severity,
        description: impl Into<String>,
        evidence: serde_json::Value,
    ) -> Result<SuspiciousActivity> {
        let activity = SuspiciousActivity {
            id: ActivityId::generate(),
            user_id: user_id.clone(),
            activity_type,
            severity,
            description: description.into(),
            evidence,
            created_at: self.env.clock().now(),
            reviewed: false,
            action: None,
            reviewed_at: None,
            reviewed_by: None,
            review_reason: None,
        };

        self.env.activities().insert(activity.clone()).await?;

        tracing::info!(
            activity_id = %activity.id,
            user_id = %user_id,
            activity_type = %activity_type,
            severity = %severity,
            "Suspicious activity recorded"
        );

        Ok(activity)
    }

    /// One record by id.
    ///
    /// # Errors
    ///
    /// Returns error if the activity store is unavailable.
    pub async fn get(&self, id: &ActivityId) -> Result<Option<SuspiciousActivity>> {
        self.env.activities().get(id).await
    }

    /// Unreviewed records, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if the activity store is unavailable.
    pub async fn list_pending(&self, limit: usize) -> Result<Vec<SuspiciousActivity>> {
        self.env.activities().list_pending(limit).await
    }

    /// Every record about one player, oldest first.
    ///
    /// # Errors
    ///
    /// Returns error if the activity store is unavailable.
    pub async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<SuspiciousActivity>> {
        self.env.activities().list_for_user(user_id).await
    }

    /// Review a pending record and apply the chosen action.
    ///
    /// # Errors
    ///
    /// - `EngineError::ActivityNotFound` for an unknown id
    /// - `EngineError::AlreadyReviewed` if the record was reviewed before;
    ///   no enforcement is applied in that case
    pub async fn review(
        &self,
        id: &ActivityId,
        action: ReviewAction,
        reason: Option<String>,
        reviewer: &UserId,
    ) -> Result<SuspiciousActivity> {
        EnforcementEngine::new(Arc::clone(&self.env))
            .apply_admin_decision(id, action, reason, reviewer)
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::error::EngineError;
    use crate::mocks::InMemoryEnvironment;
    use geoguard_testing::test_clock;
    use serde_json::json;

    fn log() -> SuspiciousActivityLog<InMemoryEnvironment> {
        let env = InMemoryEnvironment::in_memory(EngineConfig::default(), Arc::new(test_clock()));
        SuspiciousActivityLog::new(Arc::new(env))
    }

    #[tokio::test]
    async fn test_pending_queue_is_oldest_first() {
        let log = log();
        let p1 = UserId::from("p1");
        let p2 = UserId::from("p2");

        let first = log
            .record(&p1, ActivityType::Teleport, Severity::Critical, "jump", json!({}))
            .await
            .unwrap();
        log.record(&p2, ActivityType::RateAbuse, Severity::Medium, "spam", json!({}))
            .await
            .unwrap();
        log.record(&p1, ActivityType::Emulator, Severity::Critical, "emu", json!({}))
            .await
            .unwrap();

        let pending = log.list_pending(2).await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].id, first.id);

        assert_eq!(log.list_for_user(&p1).await.unwrap().len(), 2);
        assert!(!log.get(&first.id).await.unwrap().unwrap().reviewed);
    }

    #[tokio::test]
    async fn test_second_review_is_rejected() {
        let log = log();
        let admin = UserId::from("admin-1");
        let activity = log
            .record(&UserId::from("p1"), ActivityType::GpsSpoof, Severity::Critical, "mock", json!({}))
            .await
            .unwrap();

        let reviewed = log
            .review(&activity.id, ReviewAction::Dismissed, Some("legit".into()), &admin)
            .await
            .unwrap();
        assert!(reviewed.reviewed);
        assert_eq!(reviewed.action, Some(ReviewAction::Dismissed));
        assert_eq!(reviewed.reviewed_by, Some(admin.clone()));

        let again = log
            .review(&activity.id, ReviewAction::PermBan, None, &admin)
            .await;
        assert_eq!(again, Err(EngineError::AlreadyReviewed(activity.id.to_string())));

        // The first decision stands.
        let stored = log.get(&activity.id).await.unwrap().unwrap();
        assert_eq!(stored.action, Some(ReviewAction::Dismissed));
        assert!(log.list_pending(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_activity() {
        let result = log()
            .review(&ActivityId::from("missing"), ReviewAction::Warning, None, &UserId::from("a"))
            .await;
        assert_eq!(result, Err(EngineError::ActivityNotFound("missing".into())));
    }
}
