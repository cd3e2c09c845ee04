//! Per-player, per-action rate limiting.
//!
//! # Policy
//!
//! Each action has a sliding window quota and a cooldown. While fewer than
//! `max_requests` accepted requests fall inside the window, requests are
//! admitted. Once the window is full, admission is gated only by the
//! cooldown anchored on the last *accepted* request: when it has elapsed,
//! one more request is admitted (and re-anchors the cooldown). The window
//! is not re-checked independently, so a player at the cap trickles at one
//! request per cooldown until old requests age out of the window.
//!
//! Denied attempts are remembered too. When accepted plus denied attempts
//! inside the window first exceed one and a half times the quota, a
//! `rate_abuse` activity is recorded.

use crate::activity::SuspiciousActivityLog;
use crate::audit;
use crate::config::RateLimitRule;
use crate::environment::Environment;
use crate::error::Result;
use crate::model::{ActivityType, RateLimitDecision, RateLimitState, Severity, UserId};
use crate::providers::{rate_limit_key, update_versioned, RateLimitStore};
use geoguard_runtime::metrics::RateLimitMetrics;
use serde_json::json;
use std::sync::Arc;

/// An attempt counted in the player's window, awaiting its follow-up.
#[derive(Debug, Clone)]
pub struct Admission {
    decision: RateLimitDecision,
    abuse: Option<(RateLimitRule, usize)>,
}

/// Sliding-window-plus-cooldown limiter.
pub struct RateLimiter<E: Environment> {
    env: Arc<E>,
}

impl<E: Environment> RateLimiter<E> {
    /// Create a limiter over `env`.
    #[must_use]
    pub const fn new(env: Arc<E>) -> Self {
        Self { env }
    }

    /// Decide whether `user_id` may perform `action` now, and record the attempt.
    ///
    /// Actions without a configured rule are always allowed.
    ///
    /// # Errors
    ///
    /// Returns error if the rate-limit store is unavailable or the window
    /// keeps conflicting. Recording abuse never fails the check.
    pub async fn check(&self, user_id: &UserId, action: &str) -> Result<RateLimitDecision> {
        let admission = self.admit_attempt(user_id, action).await?;
        Ok(self.settle(user_id, action, admission).await)
    }

    /// Record the attempt in the player's window and decide it.
    ///
    /// This is the only step that writes rate-limit state. Once it returns
    /// `Ok` the attempt is counted and [`Self::settle`] should follow.
    ///
    /// # Errors
    ///
    /// Returns error if the rate-limit store is unavailable or the window
    /// keeps conflicting.
    pub async fn admit_attempt(&self, user_id: &UserId, action: &str) -> Result<Admission> {
        let Some(rule) = self.env.config().rate_limits.get(action).copied() else {
            return Ok(Admission {
                decision: RateLimitDecision::unlimited(),
                abuse: None,
            });
        };

        let now = self.env.clock().now_millis();
        let key = rate_limit_key(user_id, action);

        let (decision, abuse_attempts) = update_versioned(
            self.env.rate_limits(),
            &key,
            self.env.config().service.max_cas_attempts,
            |current: Option<RateLimitState>| {
                let (state, outcome) = admit(current, &rule, user_id, action, now);
                (Some(state), outcome)
            },
        )
        .await?;

        Ok(Admission {
            decision,
            abuse: abuse_attempts.map(|attempts| (rule, attempts)),
        })
    }

    /// Log the decision and record abuse for a counted attempt.
    ///
    /// Failures here are audited and never change the decision.
    pub async fn settle(&self, user_id: &UserId, action: &str, admission: Admission) -> RateLimitDecision {
        let Admission { decision, abuse } = admission;

        if decision.allowed {
            tracing::debug!(
                user_id = %user_id,
                action,
                remaining = ?decision.remaining,
                "Rate limit check passed"
            );
        } else {
            RateLimitMetrics::record_denied();
            tracing::warn!(
                rate_limit_exceeded = true,
                user_id = %user_id,
                action,
                wait_seconds = ?decision.wait_seconds,
                "Rate limit exceeded"
            );
        }

        if let Some((rule, attempts)) = abuse {
            self.record_abuse(user_id, action, &rule, attempts).await;
        }

        decision
    }

    async fn record_abuse(&self, user_id: &UserId, action: &str, rule: &RateLimitRule, attempts: usize) {
        let recorded = SuspiciousActivityLog::new(Arc::clone(&self.env))
            .record(
                user_id,
                ActivityType::RateAbuse,
                Severity::Medium,
                format!("{attempts} attempts at '{action}' within {}s", rule.window_seconds),
                json!({
                    "action": action,
                    "attempts": attempts,
                    "max_requests": rule.max_requests,
                    "window_seconds": rule.window_seconds,
                    "cooldown_seconds": rule.cooldown_seconds,
                }),
            )
            .await;

        if let Err(e) = recorded {
            audit::side_effect_failed("record_rate_abuse", user_id, &e);
        }
    }

    /// Forget the window for one (player, action) pair.
    ///
    /// # Errors
    ///
    /// Returns error if the rate-limit store is unavailable.
    pub async fn reset(&self, user_id: &UserId, action: &str) -> Result<()> {
        self.env.rate_limits().delete(&rate_limit_key(user_id, action)).await?;
        tracing::info!(user_id = %user_id, action, "Rate limit reset");
        Ok(())
    }
}

/// Pure admission step: next window state, decision, and the attempt count
/// if this attempt is the one that crossed the abuse threshold.
fn admit(
    current: Option<RateLimitState>,
    rule: &RateLimitRule,
    user_id: &UserId,
    action: &str,
    now: i64,
) -> (RateLimitState, (RateLimitDecision, Option<usize>)) {
    let Some(mut state) = current else {
        let state = RateLimitState {
            user_id: user_id.clone(),
            action: action.to_string(),
            requests: vec![now],
            last_request: now,
            rejected: Vec::new(),
            last_attempt: now,
        };
        return (state, (RateLimitDecision::allow(rule.max_requests.saturating_sub(1)), None));
    };

    let window_start = now - rule.window_millis();
    state.requests.retain(|&ts| ts > window_start);
    state.rejected.retain(|&ts| ts > window_start);
    state.last_attempt = now;

    let max_requests = rule.max_requests as usize;
    if state.requests.len() >= max_requests {
        let cooldown_remaining = state.last_request + rule.cooldown_millis() - now;
        if cooldown_remaining > 0 {
            let before = state.requests.len() + state.rejected.len();
            state.rejected.push(now);

            let threshold = rule.abuse_threshold();
            let crossed = (before <= threshold && before + 1 > threshold).then_some(before + 1);

            #[allow(clippy::cast_sign_loss)]
            let wait_seconds = ((cooldown_remaining + 999) / 1000) as u64;
            return (state, (RateLimitDecision::deny(wait_seconds), crossed));
        }
    }

    state.requests.push(now);
    state.last_request = now;

    let remaining = u32::try_from(max_requests.saturating_sub(state.requests.len())).unwrap_or(0);
    (state, (RateLimitDecision::allow(remaining), None))
}
