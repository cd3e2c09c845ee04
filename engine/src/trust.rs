//! Trust scoring and automatic escalation.

use crate::audit;
use crate::constants::reasons;
use crate::enforcement::EnforcementEngine;
use crate::environment::Environment;
use crate::error::Result;
use crate::model::{TrustFactor, TrustSummary, UserId, UserTrustScore};
use crate::providers::{update_versioned, VersionedStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Enforcement triggered by a score update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Thresholds not met.
    None,
    /// Automatic warning issued.
    Warning,
    /// Automatic temporary ban issued.
    TempBan,
}

/// Result of [`TrustScoreManager::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustUpdate {
    /// Score record as persisted.
    pub score: UserTrustScore,
    /// Enforcement that followed.
    pub escalation: Escalation,
}

/// Per-player reputation.
///
/// Every mutation is an optimistic read-modify-write on the player's record,
/// so concurrent adjustments are applied one after another, never lost.
pub struct TrustScoreManager<E: Environment> {
    env: Arc<E>,
}

impl<E: Environment> TrustScoreManager<E> {
    /// Create a manager over `env`.
    #[must_use]
    pub const fn new(env: Arc<E>) -> Self {
        Self { env }
    }

    fn initial(&self, user_id: &UserId, now: DateTime<Utc>) -> UserTrustScore {
        let config = self.env.config();
        let score = config.trust.initial_score;
        UserTrustScore::initial(user_id.clone(), score, config.tiers.tier_for(score), now)
    }

    fn cas_attempts(&self) -> usize {
        self.env.config().service.max_cas_attempts
    }

    /// Adjust a player's score by `delta` and escalate if thresholds are crossed.
    ///
    /// The score is clamped to `[0, 100]`. A negative delta counts as a
    /// violation. When `reason` is given it is kept as a factor; only the
    /// most recent factors are retained.
    ///
    /// Escalation is checked after every update, ban before warning.
    /// Escalation failures are audited and do not fail the update.
    ///
    /// # Errors
    ///
    /// Returns error if the trust score store is unavailable or the update
    /// keeps conflicting.
    pub async fn update(&self, user_id: &UserId, delta: i32, reason: Option<&str>) -> Result<TrustUpdate> {
        let config = self.env.config();
        let now = self.env.clock().now();
        let max_factors = config.trust.max_factors;

        let score = update_versioned(
            self.env.trust_scores(),
            user_id.as_str(),
            self.cas_attempts(),
            |current: Option<UserTrustScore>| {
                let mut record = current.unwrap_or_else(|| self.initial(user_id, now));

                let next = i32::from(record.score).saturating_add(delta).clamp(0, 100);
                record.score = u8::try_from(next).unwrap_or(u8::MAX);

                if let Some(reason) = reason {
                    record.factors.push(TrustFactor {
                        name: reason.to_string(),
                        impact: delta,
                        reason: reason.to_string(),
                        recorded_at: now,
                    });
                    if record.factors.len() > max_factors {
                        let excess = record.factors.len() - max_factors;
                        record.factors.drain(..excess);
                    }
                }

                if delta < 0 {
                    record.violations += 1;
                }

                record.tier = config.tiers.tier_for(record.score);
                record.last_calculated = now;

                (Some(record.clone()), record)
            },
        )
        .await?;

        tracing::debug!(
            user_id = %user_id,
            delta,
            score = score.score,
            tier = %score.tier,
            violations = score.violations,
            "Trust score updated"
        );

        let escalation = self.escalate(&score).await;
        Ok(TrustUpdate { score, escalation })
    }

    async fn escalate(&self, score: &UserTrustScore) -> Escalation {
        let thresholds = &self.env.config().trust;
        let enforcement = EnforcementEngine::new(Arc::clone(&self.env));

        if score.score < thresholds.ban_score_below && score.violations >= thresholds.ban_min_violations {
            match enforcement.issue_automatic_ban(&score.user_id, reasons::AUTO_BAN).await {
                Ok(_) => Escalation::TempBan,
                Err(e) => {
                    audit::side_effect_failed("automatic_ban", &score.user_id, &e);
                    Escalation::None
                }
            }
        } else if score.score < thresholds.warn_score_below
            && score.violations >= thresholds.warn_min_violations
        {
            match enforcement.issue_warning(&score.user_id, reasons::AUTO_WARNING).await {
                Ok(()) => Escalation::Warning,
                Err(e) => {
                    audit::side_effect_failed("automatic_warning", &score.user_id, &e);
                    Escalation::None
                }
            }
        } else {
            Escalation::None
        }
    }

    /// Existing record, or the default one created atomically.
    ///
    /// Concurrent first calls all observe the same record.
    ///
    /// # Errors
    ///
    /// Returns error if the trust score store is unavailable.
    pub async fn get_or_init(&self, user_id: &UserId) -> Result<UserTrustScore> {
        let now = self.env.clock().now();
        update_versioned(
            self.env.trust_scores(),
            user_id.as_str(),
            self.cas_attempts(),
            |current: Option<UserTrustScore>| match current {
                Some(existing) => (None, existing),
                None => {
                    let fresh = self.initial(user_id, now);
                    (Some(fresh.clone()), fresh)
                }
            },
        )
        .await
    }

    /// Stored record, without creating one.
    ///
    /// # Errors
    ///
    /// Returns error if the trust score store is unavailable.
    pub async fn get(&self, user_id: &UserId) -> Result<Option<UserTrustScore>> {
        Ok(self
            .env
            .trust_scores()
            .load(user_id.as_str())
            .await?
            .map(|stored| stored.value))
    }

    /// Player-facing tier summary.
    ///
    /// # Errors
    ///
    /// Returns error if the trust score store is unavailable.
    pub async fn summary(&self, user_id: &UserId) -> Result<TrustSummary> {
        Ok(TrustSummary::from(self.get_or_init(user_id).await?.tier))
    }

    /// Count a warning against the player.
    ///
    /// # Errors
    ///
    /// Returns error if the trust score store is unavailable.
    pub async fn record_warning_issued(&self, user_id: &UserId) -> Result<()> {
        self.bump(user_id, |record| record.warnings += 1).await
    }

    /// Count a temporary ban against the player.
    ///
    /// # Errors
    ///
    /// Returns error if the trust score store is unavailable.
    pub async fn record_temp_ban_issued(&self, user_id: &UserId) -> Result<()> {
        self.bump(user_id, |record| record.temp_bans += 1).await
    }

    async fn bump(&self, user_id: &UserId, apply: impl Fn(&mut UserTrustScore) + Send) -> Result<()> {
        let now = self.env.clock().now();
        update_versioned(
            self.env.trust_scores(),
            user_id.as_str(),
            self.cas_attempts(),
            |current: Option<UserTrustScore>| {
                let mut record = current.unwrap_or_else(|| self.initial(user_id, now));
                apply(&mut record);
                (Some(record), ())
            },
        )
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::enforcement::EnforcementEngine;
    use crate::mocks::InMemoryEnvironment;
    use crate::model::{RestrictionStatus, TrustTier};
    use geoguard_testing::{properties::trust_delta, test_clock};
    use proptest::prelude::*;

    fn env() -> Arc<InMemoryEnvironment> {
        Arc::new(InMemoryEnvironment::in_memory(EngineConfig::default(), Arc::new(test_clock())))
    }

    #[tokio::test]
    async fn test_first_evaluation_defaults_to_neutral() {
        let trust = TrustScoreManager::new(env());
        let record = trust.get_or_init(&UserId::from("p1")).await.unwrap();
        assert_eq!(record.score, 50);
        assert_eq!(record.tier, TrustTier::Neutral);
        assert_eq!((record.violations, record.warnings, record.temp_bans), (0, 0, 0));

        let summary = trust.summary(&UserId::from("p1")).await.unwrap();
        assert!(!summary.is_trusted);
    }

    #[tokio::test]
    async fn test_concurrent_first_access_creates_one_record() {
        let env = env();
        let a = TrustScoreManager::new(Arc::clone(&env));
        let b = TrustScoreManager::new(Arc::clone(&env));
        let user = UserId::from("p1");

        let (first, second) = tokio::join!(a.get_or_init(&user), b.get_or_init(&user));
        assert_eq!(first.unwrap(), second.unwrap());
        assert_eq!(env.trust_scores.len(), 1);
    }

    #[tokio::test]
    async fn test_factors_are_trimmed_oldest_first() {
        let trust = TrustScoreManager::new(env());
        let user = UserId::from("p1");

        for i in 0..25 {
            trust.update(&user, 1, Some(&format!("factor-{i}"))).await.unwrap();
        }

        let record = trust.get(&user).await.unwrap().unwrap();
        assert_eq!(record.factors.len(), 20);
        assert_eq!(record.factors[0].name, "factor-5");
        assert_eq!(record.factors[19].name, "factor-24");
    }

    #[tokio::test]
    async fn test_negative_delta_counts_violation() {
        let trust = TrustScoreManager::new(env());
        let user = UserId::from("p1");

        let update = trust.update(&user, -5, None).await.unwrap();
        assert_eq!(update.score.score, 45);
        assert_eq!(update.score.violations, 1);
        assert!(update.score.factors.is_empty());

        let update = trust.update(&user, 20, Some("good")).await.unwrap();
        assert_eq!(update.score.score, 65);
        assert_eq!(update.score.tier, TrustTier::Trusted);
        assert_eq!(update.score.violations, 1);
    }

    #[tokio::test]
    async fn test_low_score_with_three_violations_warns_only() {
        let env = env();
        let trust = TrustScoreManager::new(Arc::clone(&env));
        let user = UserId::from("p1");

        // 50 → 35 → 25 → 15 with three violations.
        trust.update(&user, -15, Some("a")).await.unwrap();
        trust.update(&user, -10, Some("b")).await.unwrap();
        let update = trust.update(&user, -10, Some("c")).await.unwrap();

        assert_eq!(update.score.score, 15);
        assert_eq!(update.escalation, Escalation::Warning);

        let status = EnforcementEngine::new(Arc::clone(&env))
            .restriction_status(&user)
            .await
            .unwrap();
        assert_eq!(status, RestrictionStatus::Warned);
        assert_eq!(trust.get(&user).await.unwrap().unwrap().warnings, 1);
    }

    #[tokio::test]
    async fn test_ban_takes_precedence_over_warning() {
        let env = env();
        let trust = TrustScoreManager::new(Arc::clone(&env));
        let user = UserId::from("p1");

        // Both ban and warning conditions hold on the fifth violation.
        for _ in 0..4 {
            trust.update(&user, -1, None).await.unwrap();
        }
        let update = trust.update(&user, -100, None).await.unwrap();

        assert_eq!(update.score.score, 0);
        assert_eq!(update.score.violations, 5);
        assert_eq!(update.escalation, Escalation::TempBan);

        let record = trust.get(&user).await.unwrap().unwrap();
        assert_eq!(record.temp_bans, 1);
        assert_eq!(record.warnings, 0);

        let status = EnforcementEngine::new(env).restriction_status(&user).await.unwrap();
        assert!(matches!(status, RestrictionStatus::TempBanned { .. }));
    }

    proptest! {
        #[test]
        fn prop_score_stays_in_range(deltas in proptest::collection::vec(trust_delta(), 1..8)) {
            let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            runtime.block_on(async {
                let trust = TrustScoreManager::new(env());
                let user = UserId::from("p1");
                for delta in deltas {
                    let update = trust.update(&user, delta, Some("prop")).await.unwrap();
                    prop_assert!(update.score.score <= 100);
                    prop_assert_eq!(update.score.tier, EngineConfig::default().tiers.tier_for(update.score.score));
                }
                Ok(())
            })?;
        }
    }
}
