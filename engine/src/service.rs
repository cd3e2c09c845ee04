//! RPC facade.
//!
//! Every public operation of the engine, as seen by game-logic callers:
//! caller identity is checked first, then the operation runs under a
//! caller-side deadline with one retry on transient store failures.
//!
//! Writing operations are split at their commit. Only the store write runs
//! under the deadline; evidence capture, trust adjustment and enforcement
//! run after it without one, so a slow follow-up cannot turn a committed
//! outcome into a timeout.
//!
//! When the store stays unreachable, validation and rate limiting fail open:
//! the rate limiter allows the action and the validator returns a verdict
//! from the stateless checks only, marked `degraded`. Both emit an audit
//! event. Trust and review operations have no safe default and surface the
//! error instead.

use crate::activity::SuspiciousActivityLog;
use crate::audit;
use crate::enforcement::EnforcementEngine;
use crate::environment::Environment;
use crate::error::{EngineError, Result};
use crate::model::{
    ActivityId, Caller, DeviceInfo, LocationReport, LocationValidation, RateLimitDecision,
    ReviewAction, SuspiciousActivity, TrustSummary,
};
use crate::rate_limit::RateLimiter;
use crate::trust::TrustScoreManager;
use crate::validator::LocationValidator;
use geoguard_runtime::{retry_if, with_deadline};
use std::future::Future;
use std::sync::Arc;

/// Entry point for all caller-facing operations.
pub struct AntiCheatService<E: Environment> {
    env: Arc<E>,
}

impl<E: Environment> Clone for AntiCheatService<E> {
    fn clone(&self) -> Self {
        Self {
            env: Arc::clone(&self.env),
        }
    }
}

impl<E: Environment> AntiCheatService<E> {
    /// Create the facade over `env`.
    #[must_use]
    pub const fn new(env: Arc<E>) -> Self {
        Self { env }
    }

    /// Shared environment.
    #[must_use]
    pub const fn environment(&self) -> &Arc<E> {
        &self.env
    }

    /// Run `operation` under the call deadline, retrying transient failures.
    async fn guarded<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let policy = &self.env.config().service;
        with_deadline(
            policy.call_timeout,
            retry_if(&policy.retry, operation, EngineError::is_transient),
        )
        .await?
    }

    /// Run `operation` under the call deadline only.
    ///
    /// For operations that must not be replayed after a partial success.
    async fn deadline_only<T>(&self, operation: impl Future<Output = Result<T>>) -> Result<T> {
        with_deadline(self.env.config().service.call_timeout, operation).await?
    }

    /// `ValidateLocation`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Unauthenticated` without a caller identity.
    /// Store failures fail open.
    pub async fn validate_location(
        &self,
        caller: &Caller,
        report: LocationReport,
        device: Option<DeviceInfo>,
    ) -> Result<LocationValidation> {
        let user_id = caller.require_user()?;
        let validator = LocationValidator::new(Arc::clone(&self.env));

        let committed = {
            let validator = &validator;
            let report = &report;
            let device = device.as_ref();
            self.guarded(move || validator.record_report(user_id, report, device)).await
        };

        match committed {
            Ok(recorded) => Ok(validator.settle(user_id, recorded).await),
            Err(e) if e.is_transient() => {
                audit::fail_open("validate_location", user_id, &e);
                Ok(validator.validate_stateless(&report, device.as_ref()))
            }
            Err(e) => Err(e),
        }
    }

    /// `CheckRateLimit`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Unauthenticated` without a caller identity.
    /// Store failures fail open.
    pub async fn check_rate_limit(&self, caller: &Caller, action: &str) -> Result<RateLimitDecision> {
        let user_id = caller.require_user()?;
        let limiter = RateLimiter::new(Arc::clone(&self.env));

        let committed = {
            let limiter = &limiter;
            self.guarded(move || limiter.admit_attempt(user_id, action)).await
        };

        match committed {
            Ok(admission) => Ok(limiter.settle(user_id, action, admission).await),
            Err(e) if e.is_transient() => {
                audit::fail_open("check_rate_limit", user_id, &e);
                Ok(RateLimitDecision::unlimited())
            }
            Err(e) => Err(e),
        }
    }

    /// `GetTrustScore`: tier only, never the raw score.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Unauthenticated` without a caller identity, or
    /// the store error once retries are exhausted.
    pub async fn get_trust_score(&self, caller: &Caller) -> Result<TrustSummary> {
        let user_id = caller.require_user()?;
        let trust = TrustScoreManager::new(Arc::clone(&self.env));
        let trust = &trust;
        self.guarded(move || trust.summary(user_id)).await
    }

    /// `ReviewSuspiciousActivity` (admin).
    ///
    /// Recording the review is not retried: a replay after it was recorded
    /// would be rejected as already reviewed. The decision is then applied
    /// outside the deadline, retrying transient failures.
    ///
    /// # Errors
    ///
    /// - `EngineError::Unauthenticated` / `EngineError::PermissionDenied`
    /// - `EngineError::ActivityNotFound` / `EngineError::AlreadyReviewed`
    /// - store errors and `EngineError::Timeout`
    pub async fn review_suspicious_activity(
        &self,
        caller: &Caller,
        activity_id: &ActivityId,
        action: ReviewAction,
        reason: Option<String>,
    ) -> Result<SuspiciousActivity> {
        let reviewer = caller.require_admin()?;
        let enforcement = EnforcementEngine::new(Arc::clone(&self.env));
        let activity = self
            .deadline_only(enforcement.mark_reviewed(activity_id, action, reason.clone(), reviewer))
            .await?;

        {
            let enforcement = &enforcement;
            let activity = &activity;
            let reason = &reason;
            retry_if(
                &self.env.config().service.retry,
                move || enforcement.apply_review_action(activity, action, reason.clone()),
                EngineError::is_transient,
            )
            .await?;
        }

        Ok(activity)
    }

    /// Pending review queue (admin), oldest first.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Unauthenticated` / `EngineError::PermissionDenied`,
    /// or the store error once retries are exhausted.
    pub async fn list_pending_activities(
        &self,
        caller: &Caller,
        limit: Option<usize>,
    ) -> Result<Vec<SuspiciousActivity>> {
        caller.require_admin()?;
        let page_size = self.env.config().service.pending_page_size;
        let limit = limit.unwrap_or(page_size).min(page_size);
        let log = SuspiciousActivityLog::new(Arc::clone(&self.env));
        let log = &log;
        self.guarded(move || log.list_pending(limit)).await
    }
}
