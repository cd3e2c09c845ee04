//! Engine configuration.
//!
//! All tables are immutable once built. The process constructs one
//! [`EngineConfig`] at startup and shares it through the environment; tests
//! build their own with the `with_*` builders.

use crate::model::{Severity, TrustTier};
use chrono::Duration;
use geoguard_runtime::RetryPolicy;
use std::collections::HashMap;

/// Quota for one action kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    /// Accepted requests per window before the cooldown gate applies.
    pub max_requests: u32,
    /// Sliding window length in seconds.
    pub window_seconds: i64,
    /// Minimum spacing after the last accepted request once the window is full.
    pub cooldown_seconds: i64,
}

impl RateLimitRule {
    /// Create a rule.
    #[must_use]
    pub const fn new(max_requests: u32, window_seconds: i64, cooldown_seconds: i64) -> Self {
        Self {
            max_requests,
            window_seconds,
            cooldown_seconds,
        }
    }

    /// Window length in milliseconds.
    #[must_use]
    pub const fn window_millis(&self) -> i64 {
        self.window_seconds * 1000
    }

    /// Cooldown in milliseconds.
    #[must_use]
    pub const fn cooldown_millis(&self) -> i64 {
        self.cooldown_seconds * 1000
    }

    /// Attempts (accepted plus denied) inside one window that count as abuse.
    ///
    /// Abuse starts strictly above one and a half times the quota.
    #[must_use]
    pub const fn abuse_threshold(&self) -> usize {
        (self.max_requests as usize * 3) / 2
    }
}

/// Action name → quota table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitRules {
    rules: HashMap<String, RateLimitRule>,
}

impl RateLimitRules {
    /// Empty table: every action is unlimited.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Add or replace the rule for `action`.
    #[must_use]
    pub fn with_rule(mut self, action: impl Into<String>, rule: RateLimitRule) -> Self {
        self.rules.insert(action.into(), rule);
        self
    }

    /// Rule for `action`, if one is configured.
    #[must_use]
    pub fn get(&self, action: &str) -> Option<&RateLimitRule> {
        self.rules.get(action)
    }

    /// Configured action names.
    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }
}

impl Default for RateLimitRules {
    fn default() -> Self {
        Self::empty()
            .with_rule("validate_location", RateLimitRule::new(60, 60, 5))
            .with_rule("attack", RateLimitRule::new(10, 60, 30))
            .with_rule("capture_territory", RateLimitRule::new(5, 300, 60))
            .with_rule("chat_message", RateLimitRule::new(20, 60, 10))
            .with_rule("purchase", RateLimitRule::new(5, 60, 10))
    }
}

/// Score → tier table.
///
/// Each entry is the inclusive upper bound of a tier; the bounds must be
/// ascending and the last must be 100 so every score maps to exactly one tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierTable {
    bounds: [(u8, TrustTier); 5],
}

impl TierTable {
    /// Tier for `score`. Scores above the last bound map to the top tier.
    #[must_use]
    pub fn tier_for(&self, score: u8) -> TrustTier {
        self.bounds
            .iter()
            .find(|(upper, _)| score <= *upper)
            .map_or(TrustTier::Verified, |(_, tier)| *tier)
    }
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            bounds: [
                (20, TrustTier::Untrusted),
                (40, TrustTier::Suspicious),
                (60, TrustTier::Neutral),
                (80, TrustTier::Trusted),
                (100, TrustTier::Verified),
            ],
        }
    }
}

/// Severity → risk weight, shared by every check scored by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeverityWeights {
    /// Weight of a low-severity flag.
    pub low: u32,
    /// Weight of a medium-severity flag.
    pub medium: u32,
    /// Weight of a high-severity flag.
    pub high: u32,
    /// Weight of a critical flag.
    pub critical: u32,
}

impl SeverityWeights {
    /// Weight for `severity`.
    #[must_use]
    pub const fn weight(&self, severity: Severity) -> u32 {
        match severity {
            Severity::Low => self.low,
            Severity::Medium => self.medium,
            Severity::High => self.high,
            Severity::Critical => self.critical,
        }
    }
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            low: 2,
            medium: 5,
            high: 10,
            critical: 25,
        }
    }
}

/// Location validation thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorConfig {
    /// Accuracy radius above which a report is flagged (meters).
    pub max_accuracy_meters: f64,
    /// Risk added for a coarse accuracy radius.
    pub low_accuracy_risk: u32,
    /// Speed above which movement is a teleport (m/s).
    pub teleport_speed: f64,
    /// Risk added for a teleport.
    pub teleport_risk: u32,
    /// Speed above which movement is physically impossible on the ground (m/s).
    pub impossible_speed: f64,
    /// Risk added for impossible speed.
    pub impossible_speed_risk: u32,
    /// Speed above which movement is suspiciously fast (m/s).
    pub high_speed: f64,
    /// Risk added for high speed.
    pub high_speed_risk: u32,
    /// Number of recent points inspected for zigzag movement.
    pub pattern_window: usize,
    /// Minimum history length before the pattern check runs.
    pub pattern_min_points: usize,
    /// Fraction of sharp turns above which the path is a zigzag.
    pub zigzag_ratio: f64,
    /// Risk added for a zigzag path.
    pub zigzag_risk: u32,
    /// Stored history length per player.
    pub history_cap: usize,
    /// Risk strictly below which a stored record is marked validated.
    pub record_valid_below: u32,
    /// Risk at or above which the trust score is reduced.
    pub trust_penalty_threshold: u32,
    /// Risk strictly below which a report is valid.
    pub valid_below: u32,
    /// How far ahead of the server clock a client timestamp may be.
    pub future_tolerance: Duration,
}

impl ValidatorConfig {
    /// Set the accuracy threshold.
    #[must_use]
    pub const fn with_max_accuracy(mut self, meters: f64) -> Self {
        self.max_accuracy_meters = meters;
        self
    }

    /// Set the client clock tolerance.
    #[must_use]
    pub const fn with_future_tolerance(mut self, tolerance: Duration) -> Self {
        self.future_tolerance = tolerance;
        self
    }

    /// Set the stored history length.
    #[must_use]
    pub const fn with_history_cap(mut self, cap: usize) -> Self {
        self.history_cap = cap;
        self
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_accuracy_meters: 100.0,
            low_accuracy_risk: 5,
            teleport_speed: 200.0,
            teleport_risk: 50,
            impossible_speed: 100.0,
            impossible_speed_risk: 30,
            high_speed: 45.0,
            high_speed_risk: 10,
            pattern_window: 10,
            pattern_min_points: 3,
            zigzag_ratio: 0.7,
            zigzag_risk: 15,
            history_cap: 100,
            record_valid_below: 30,
            trust_penalty_threshold: 20,
            valid_below: 50,
            future_tolerance: Duration::minutes(5),
        }
    }
}

/// Trust scoring and escalation thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustConfig {
    /// Score assigned on first evaluation.
    pub initial_score: u8,
    /// Number of factors kept per player.
    pub max_factors: usize,
    /// Score strictly below which a player with enough violations is banned.
    pub ban_score_below: u8,
    /// Violations required for an automatic ban.
    pub ban_min_violations: u32,
    /// Score strictly below which a player with enough violations is warned.
    pub warn_score_below: u8,
    /// Violations required for an automatic warning.
    pub warn_min_violations: u32,
    /// Length of automatic and admin temporary bans.
    pub temp_ban_duration: Duration,
    /// Score restored when an admin dismisses a report.
    pub dismissal_credit: i32,
}

impl TrustConfig {
    /// Set the temporary ban length.
    #[must_use]
    pub const fn with_temp_ban_duration(mut self, duration: Duration) -> Self {
        self.temp_ban_duration = duration;
        self
    }
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            initial_score: 50,
            max_factors: 20,
            ban_score_below: 10,
            ban_min_violations: 5,
            warn_score_below: 20,
            warn_min_violations: 3,
            temp_ban_duration: Duration::days(7),
            dismissal_credit: 5,
        }
    }
}

/// Facade call policy.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Caller-side budget for one operation, retries included.
    pub call_timeout: std::time::Duration,
    /// Retry policy for transient store failures.
    pub retry: RetryPolicy,
    /// Optimistic update attempts before giving up with a conflict.
    pub max_cas_attempts: usize,
    /// Page size for the pending review queue.
    pub pending_page_size: usize,
}

impl ServiceConfig {
    /// Set the call budget.
    #[must_use]
    pub const fn with_call_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            call_timeout: std::time::Duration::from_millis(250),
            retry: RetryPolicy::default(),
            max_cas_attempts: 5,
            pending_page_size: 50,
        }
    }
}

/// Scheduled pruning of stale rate-limit windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceConfig {
    /// Records whose last attempt is older than this are deleted.
    pub retention: std::time::Duration,
    /// Time between runs.
    pub interval: std::time::Duration,
}

impl MaintenanceConfig {
    /// Create a maintenance schedule.
    #[must_use]
    pub const fn new(retention: std::time::Duration, interval: std::time::Duration) -> Self {
        Self { retention, interval }
    }
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            retention: std::time::Duration::from_secs(60 * 60),
            interval: std::time::Duration::from_secs(6 * 60 * 60),
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Rate-limit rule table.
    pub rate_limits: RateLimitRules,
    /// Score → tier table.
    pub tiers: TierTable,
    /// Severity → risk weight table.
    pub severity_weights: SeverityWeights,
    /// Validator thresholds.
    pub validator: ValidatorConfig,
    /// Trust thresholds.
    pub trust: TrustConfig,
    /// Facade call policy.
    pub service: ServiceConfig,
}

impl EngineConfig {
    /// Replace the rate-limit rules.
    #[must_use]
    pub fn with_rate_limits(mut self, rules: RateLimitRules) -> Self {
        self.rate_limits = rules;
        self
    }

    /// Replace the validator thresholds.
    #[must_use]
    pub fn with_validator(mut self, validator: ValidatorConfig) -> Self {
        self.validator = validator;
        self
    }

    /// Replace the trust thresholds.
    #[must_use]
    pub fn with_trust(mut self, trust: TrustConfig) -> Self {
        self.trust = trust;
        self
    }

    /// Replace the facade call policy.
    #[must_use]
    pub fn with_service(mut self, service: ServiceConfig) -> Self {
        self.service = service;
        self
    }
}
