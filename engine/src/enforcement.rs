//! Warnings, bans and admin review decisions.
//!
//! Account restriction follows
//! `unrestricted → warned → temp_banned → perm_banned`. Warnings are
//! informational and accumulate; only bans change whether the player may
//! play. A temporary ban reverts on its own once it expires, a permanent ban
//! is terminal and can only be lifted out of band.

use crate::audit;
use crate::environment::Environment;
use crate::error::Result;
use crate::model::{
    AccountRecord, ActivityId, BanKind, BanRecord, Review, ReviewAction, RestrictionStatus,
    SuspiciousActivity, UserId, WarningRecord,
};
use crate::providers::{update_versioned, ActivityStore, VersionedStore};
use crate::trust::TrustScoreManager;
use std::sync::Arc;

/// Applies warnings and bans to account records.
pub struct EnforcementEngine<E: Environment> {
    env: Arc<E>,
}

impl<E: Environment> EnforcementEngine<E> {
    /// Create an engine over `env`.
    #[must_use]
    pub const fn new(env: Arc<E>) -> Self {
        Self { env }
    }

    async fn update_account<R>(
        &self,
        user_id: &UserId,
        mutate: impl FnMut(AccountRecord) -> (Option<AccountRecord>, R) + Send,
    ) -> Result<R> {
        let mut mutate = mutate;
        update_versioned(
            self.env.accounts(),
            user_id.as_str(),
            self.env.config().service.max_cas_attempts,
            |current: Option<AccountRecord>| {
                mutate(current.unwrap_or_else(|| AccountRecord::new(user_id.clone())))
            },
        )
        .await
    }

    /// Add a warning to the account and count it on the trust record.
    ///
    /// # Errors
    ///
    /// Returns error if the account store is unavailable.
    pub async fn issue_warning(&self, user_id: &UserId, reason: &str) -> Result<()> {
        let now = self.env.clock().now();
        self.update_account(user_id, |mut account| {
            account.warnings.push(WarningRecord {
                reason: reason.to_string(),
                issued_at: now,
            });
            (Some(account), ())
        })
        .await?;

        audit::enforcement("warning", user_id, reason);

        if let Err(e) = TrustScoreManager::new(Arc::clone(&self.env))
            .record_warning_issued(user_id)
            .await
        {
            audit::side_effect_failed("count_warning", user_id, &e);
        }

        Ok(())
    }

    /// Temporarily ban the account for the configured duration.
    ///
    /// An existing permanent ban is never downgraded; in that case nothing
    /// changes and `PermBanned` is returned.
    ///
    /// # Errors
    ///
    /// Returns error if the account store is unavailable.
    pub async fn issue_automatic_ban(&self, user_id: &UserId, reason: &str) -> Result<RestrictionStatus> {
        let now = self.env.clock().now();
        let until = now + self.env.config().trust.temp_ban_duration;

        let status = self
            .update_account(user_id, |mut account| {
                if matches!(&account.ban, Some(ban) if ban.kind == BanKind::Permanent) {
                    return (None, RestrictionStatus::PermBanned);
                }
                account.ban = Some(BanRecord {
                    kind: BanKind::Temporary,
                    reason: reason.to_string(),
                    issued_at: now,
                    expires_at: Some(until),
                });
                (Some(account), RestrictionStatus::TempBanned { until })
            })
            .await?;

        if status == RestrictionStatus::PermBanned {
            tracing::info!(user_id = %user_id, "Account already permanently banned, temporary ban skipped");
            return Ok(status);
        }

        audit::enforcement("temp_ban", user_id, reason);

        if let Err(e) = TrustScoreManager::new(Arc::clone(&self.env))
            .record_temp_ban_issued(user_id)
            .await
        {
            audit::side_effect_failed("count_temp_ban", user_id, &e);
        }

        Ok(status)
    }

    /// Permanently ban the account.
    ///
    /// # Errors
    ///
    /// Returns error if the account store is unavailable.
    pub async fn issue_permanent_ban(&self, user_id: &UserId, reason: &str) -> Result<()> {
        let now = self.env.clock().now();
        self.update_account(user_id, |mut account| {
            account.ban = Some(BanRecord {
                kind: BanKind::Permanent,
                reason: reason.to_string(),
                issued_at: now,
                expires_at: None,
            });
            (Some(account), ())
        })
        .await?;

        audit::enforcement("perm_ban", user_id, reason);
        Ok(())
    }

    /// Mark an activity reviewed and apply the reviewer's decision.
    ///
    /// The review is recorded first, atomically, so a decision is applied at
    /// most once even when two admins act on the same record. `dismissed`
    /// credits the player's trust score.
    ///
    /// # Errors
    ///
    /// - `EngineError::ActivityNotFound` for an unknown id
    /// - `EngineError::AlreadyReviewed` if the record was reviewed before
    /// - store errors while applying the decision; the review stays recorded
    pub async fn apply_admin_decision(
        &self,
        activity_id: &ActivityId,
        action: ReviewAction,
        reason: Option<String>,
        reviewer: &UserId,
    ) -> Result<SuspiciousActivity> {
        let activity = self.mark_reviewed(activity_id, action, reason.clone(), reviewer).await?;
        self.apply_review_action(&activity, action, reason).await?;
        Ok(activity)
    }

    /// Record the review on the activity.
    ///
    /// This is the step that claims the activity. Once it returns `Ok`,
    /// [`Self::apply_review_action`] should follow.
    ///
    /// # Errors
    ///
    /// - `EngineError::ActivityNotFound` for an unknown id
    /// - `EngineError::AlreadyReviewed` if the record was reviewed before
    pub async fn mark_reviewed(
        &self,
        activity_id: &ActivityId,
        action: ReviewAction,
        reason: Option<String>,
        reviewer: &UserId,
    ) -> Result<SuspiciousActivity> {
        let review = Review {
            action,
            reason,
            reviewer: reviewer.clone(),
            reviewed_at: self.env.clock().now(),
        };

        let activity = self.env.activities().mark_reviewed(activity_id, &review).await?;
        audit::review(activity_id.as_str(), reviewer, &action.to_string());
        Ok(activity)
    }

    /// Apply a reviewer's decision to the player behind a reviewed activity.
    ///
    /// # Errors
    ///
    /// Returns error if the account or trust store is unavailable. The
    /// failure is audited.
    pub async fn apply_review_action(
        &self,
        activity: &SuspiciousActivity,
        action: ReviewAction,
        reason: Option<String>,
    ) -> Result<()> {
        let reason = reason.unwrap_or_else(|| {
            format!("Admin review of {} activity {}", activity.activity_type, activity.id)
        });

        let applied = match action {
            ReviewAction::Warning => self.issue_warning(&activity.user_id, &reason).await,
            ReviewAction::TempBan => self
                .issue_automatic_ban(&activity.user_id, &reason)
                .await
                .map(|_| ()),
            ReviewAction::PermBan => self.issue_permanent_ban(&activity.user_id, &reason).await,
            ReviewAction::Dismissed => {
                let credit = self.env.config().trust.dismissal_credit;
                TrustScoreManager::new(Arc::clone(&self.env))
                    .update(
                        &activity.user_id,
                        credit,
                        Some(crate::constants::factors::FALSE_POSITIVE_CLEARED),
                    )
                    .await
                    .map(|_| ())
            }
        };

        if let Err(e) = &applied {
            audit::side_effect_failed("apply_review", &activity.user_id, e);
        }
        applied
    }

    /// Current restriction state.
    ///
    /// # Errors
    ///
    /// Returns error if the account store is unavailable.
    pub async fn restriction_status(&self, user_id: &UserId) -> Result<RestrictionStatus> {
        let now = self.env.clock().now();
        Ok(self
            .env
            .accounts()
            .load(user_id.as_str())
            .await?
            .map_or(RestrictionStatus::Unrestricted, |stored| stored.value.status(now)))
    }

    /// Whether the player is currently banned.
    ///
    /// # Errors
    ///
    /// Returns error if the account store is unavailable.
    pub async fn is_restricted(&self, user_id: &UserId) -> Result<bool> {
        Ok(self.restriction_status(user_id).await?.is_banned())
    }
}
