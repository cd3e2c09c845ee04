//! Domain types persisted or returned by the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Player identifier, as asserted by the upstream authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Create a user id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Suspicious activity identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(pub String);

impl ActivityId {
    /// Generate a fresh random id.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActivityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Caller identity as established by the upstream gateway.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Caller {
    /// Authenticated player, if any.
    pub user_id: Option<UserId>,
    /// Granted claims.
    pub claims: Vec<String>,
}

impl Caller {
    /// Authenticated caller with `claims`.
    #[must_use]
    pub fn authenticated(user_id: impl Into<String>, claims: &[&str]) -> Self {
        Self {
            user_id: Some(UserId::new(user_id)),
            claims: claims.iter().map(ToString::to_string).collect(),
        }
    }

    /// Caller without identity.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Whether the caller holds `claim`.
    #[must_use]
    pub fn has_claim(&self, claim: &str) -> bool {
        self.claims.iter().any(|held| held == claim)
    }

    /// The caller's user id.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Unauthenticated` for anonymous callers.
    pub fn require_user(&self) -> crate::error::Result<&UserId> {
        self.user_id
            .as_ref()
            .filter(|user_id| !user_id.as_str().is_empty())
            .ok_or(crate::error::EngineError::Unauthenticated)
    }

    /// The caller's user id, provided they hold the admin claim.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Unauthenticated` for anonymous callers and
    /// `EngineError::PermissionDenied` without the admin claim.
    pub fn require_admin(&self) -> crate::error::Result<&UserId> {
        let user_id = self.require_user()?;
        if self.has_claim(crate::constants::claims::ADMIN) {
            Ok(user_id)
        } else {
            Err(crate::error::EngineError::PermissionDenied {
                required: crate::constants::claims::ADMIN.to_string(),
            })
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Location
// ═══════════════════════════════════════════════════════════

/// Positioning provider that produced a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationSource {
    /// Satellite fix.
    Gps,
    /// Cell / Wi-Fi fix.
    Network,
    /// OS sensor fusion.
    Fused,
    /// Not reported.
    #[default]
    Unknown,
}

/// Position report submitted by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationReport {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Accuracy radius in meters.
    pub accuracy: f64,
    /// Altitude in meters, if known.
    #[serde(default)]
    pub altitude: Option<f64>,
    /// Client timestamp, Unix milliseconds.
    pub timestamp: i64,
    /// Positioning provider.
    #[serde(default)]
    pub source: LocationSource,
}

impl LocationReport {
    /// Report with just the required fields.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64, accuracy: f64, timestamp: i64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            altitude: None,
            timestamp,
            source: LocationSource::Unknown,
        }
    }
}

/// Stored position. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Accuracy radius in meters.
    pub accuracy: f64,
    /// Altitude in meters, if known.
    pub altitude: Option<f64>,
    /// Client timestamp, Unix milliseconds.
    pub timestamp: i64,
    /// Positioning provider.
    pub source: LocationSource,
    /// Whether the report passed validation (risk below the record threshold).
    pub validated: bool,
}

impl LocationRecord {
    /// Build a record from a report.
    #[must_use]
    pub const fn from_report(report: &LocationReport, validated: bool) -> Self {
        Self {
            latitude: report.latitude,
            longitude: report.longitude,
            accuracy: report.accuracy,
            altitude: report.altitude,
            timestamp: report.timestamp,
            source: report.source,
            validated,
        }
    }
}

/// Per-player ordered position history, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLocationHistory {
    /// Owner.
    pub user_id: UserId,
    /// Records, oldest first.
    pub records: Vec<LocationRecord>,
}

impl UserLocationHistory {
    /// Empty history.
    #[must_use]
    pub const fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            records: Vec::new(),
        }
    }

    /// Most recent record.
    #[must_use]
    pub fn last(&self) -> Option<&LocationRecord> {
        self.records.last()
    }

    /// The `n` most recent records, oldest first.
    #[must_use]
    pub fn recent(&self, n: usize) -> &[LocationRecord] {
        let start = self.records.len().saturating_sub(n);
        &self.records[start..]
    }

    /// Append a record, evicting the oldest beyond `cap`.
    pub fn push_capped(&mut self, record: LocationRecord, cap: usize) {
        self.records.push(record);
        if self.records.len() > cap {
            let excess = self.records.len() - cap;
            self.records.drain(..excess);
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Device
// ═══════════════════════════════════════════════════════════

/// Device integrity attributes reported by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceInfo {
    /// Running inside an emulator.
    pub is_emulator: bool,
    /// Rooted (Android) or jailbroken (iOS).
    pub is_rooted: bool,
    /// OS mock-location setting enabled.
    pub mock_locations_enabled: bool,
    /// Developer options enabled.
    pub developer_options_enabled: bool,
    /// Client binary failed integrity attestation.
    pub tampered_client: bool,
}

impl DeviceInfo {
    /// Leniently read device info from arbitrary JSON.
    ///
    /// Non-objects read as "no device info". Missing or non-boolean fields
    /// read as `false`. `is_jailbroken` is accepted as an alias for
    /// `is_rooted`, and camelCase keys are accepted as sent by mobile clients.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let object = value.as_object()?;
        let flag = |keys: &[&str]| {
            keys.iter()
                .any(|key| object.get(*key).and_then(serde_json::Value::as_bool).unwrap_or(false))
        };

        Some(Self {
            is_emulator: flag(&["is_emulator", "isEmulator"]),
            is_rooted: flag(&["is_rooted", "isRooted", "is_jailbroken", "isJailbroken"]),
            mock_locations_enabled: flag(&["mock_locations_enabled", "mockLocationsEnabled"]),
            developer_options_enabled: flag(&["developer_options_enabled", "developerOptionsEnabled"]),
            tampered_client: flag(&["tampered_client", "tamperedClient"]),
        })
    }
}

// ═══════════════════════════════════════════════════════════
// Validation
// ═══════════════════════════════════════════════════════════

/// Flag severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational.
    Low,
    /// Worth watching.
    Medium,
    /// Likely cheating.
    High,
    /// Almost certainly cheating.
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// A single finding produced during validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFlag {
    /// Machine-readable code, see [`crate::constants::flags`].
    pub code: String,
    /// Severity.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
    /// When the flag was raised.
    pub timestamp: DateTime<Utc>,
}

/// Verdict returned by `ValidateLocation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationValidation {
    /// `risk_score < 50`.
    pub is_valid: bool,
    /// `max(0, 100 - risk_score)`.
    pub confidence: u32,
    /// Findings, in evaluation order.
    pub flags: Vec<ValidationFlag>,
    /// Accumulated risk.
    pub risk_score: u32,
    /// Set when the store was unavailable and only stateless checks ran.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
}

impl LocationValidation {
    /// Whether a flag with `code` was raised.
    #[must_use]
    pub fn has_flag(&self, code: &str) -> bool {
        self.flags.iter().any(|flag| flag.code == code)
    }
}

// ═══════════════════════════════════════════════════════════
// Suspicious Activity
// ═══════════════════════════════════════════════════════════

/// Kind of anomaly captured as evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    /// Physically impossible jump between reports.
    Teleport,
    /// Sustained speed beyond ground travel.
    ImpossibleSpeed,
    /// Location spoofing tool detected.
    GpsSpoof,
    /// Client running in an emulator.
    Emulator,
    /// Tampered client binary.
    ModifiedClient,
    /// Client clock manipulation.
    TimeManipulation,
    /// Automated play.
    BotBehavior,
    /// Hammering a rate-limited action.
    RateAbuse,
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Teleport => "teleport",
            Self::ImpossibleSpeed => "impossible_speed",
            Self::GpsSpoof => "gps_spoof",
            Self::Emulator => "emulator",
            Self::ModifiedClient => "modified_client",
            Self::TimeManipulation => "time_manipulation",
            Self::BotBehavior => "bot_behavior",
            Self::RateAbuse => "rate_abuse",
        };
        f.write_str(name)
    }
}

/// Outcome chosen by an admin reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    /// Issue a warning.
    Warning,
    /// Issue a temporary ban.
    TempBan,
    /// Issue a permanent ban.
    PermBan,
    /// False positive; compensate the player.
    Dismissed,
}

impl fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Warning => "warning",
            Self::TempBan => "temp_ban",
            Self::PermBan => "perm_ban",
            Self::Dismissed => "dismissed",
        };
        f.write_str(name)
    }
}

/// Evidence-bearing record of a detected anomaly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspiciousActivity {
    /// Identifier.
    pub id: ActivityId,
    /// Player the evidence is about.
    pub user_id: UserId,
    /// Anomaly kind.
    pub activity_type: ActivityType,
    /// Severity.
    pub severity: Severity,
    /// Human-readable summary.
    pub description: String,
    /// Opaque structured payload.
    pub evidence: serde_json::Value,
    /// Capture time.
    pub created_at: DateTime<Utc>,
    /// Whether an admin has reviewed it.
    pub reviewed: bool,
    /// Review outcome.
    pub action: Option<ReviewAction>,
    /// Review time.
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Reviewer id.
    pub reviewed_by: Option<UserId>,
    /// Reviewer note.
    pub review_reason: Option<String>,
}

impl SuspiciousActivity {
    /// Copy a review outcome onto the record.
    pub fn apply_review(&mut self, review: &Review) {
        self.reviewed = true;
        self.action = Some(review.action);
        self.reviewed_at = Some(review.reviewed_at);
        self.reviewed_by = Some(review.reviewer.clone());
        self.review_reason.clone_from(&review.reason);
    }
}

/// Review to apply to a pending activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Outcome.
    pub action: ReviewAction,
    /// Reviewer note.
    pub reason: Option<String>,
    /// Reviewer id.
    pub reviewer: UserId,
    /// Review time.
    pub reviewed_at: DateTime<Utc>,
}

// ═══════════════════════════════════════════════════════════
// Trust
// ═══════════════════════════════════════════════════════════

/// Coarse reputation class derived from the trust score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustTier {
    /// 0–20.
    Untrusted,
    /// 21–40.
    Suspicious,
    /// 41–60.
    Neutral,
    /// 61–80.
    Trusted,
    /// 81–100.
    Verified,
}

impl fmt::Display for TrustTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Untrusted => "untrusted",
            Self::Suspicious => "suspicious",
            Self::Neutral => "neutral",
            Self::Trusted => "trusted",
            Self::Verified => "verified",
        };
        f.write_str(name)
    }
}

/// One contribution to a trust score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustFactor {
    /// Factor name.
    pub name: String,
    /// Signed score change.
    pub impact: i32,
    /// Free-form explanation.
    pub reason: String,
    /// When it was applied.
    pub recorded_at: DateTime<Utc>,
}

/// Decaying per-player reputation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTrustScore {
    /// Owner.
    pub user_id: UserId,
    /// Score in `[0, 100]`.
    pub score: u8,
    /// Tier derived from `score`.
    pub tier: TrustTier,
    /// Most recent contributions, oldest first.
    pub factors: Vec<TrustFactor>,
    /// Last recalculation.
    pub last_calculated: DateTime<Utc>,
    /// Number of negative adjustments.
    pub violations: u32,
    /// Warnings issued.
    pub warnings: u32,
    /// Temporary bans issued.
    pub temp_bans: u32,
}

impl UserTrustScore {
    /// Default record for a player evaluated for the first time.
    #[must_use]
    pub const fn initial(user_id: UserId, score: u8, tier: TrustTier, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            score,
            tier,
            factors: Vec::new(),
            last_calculated: now,
            violations: 0,
            warnings: 0,
            temp_bans: 0,
        }
    }
}

/// Player-facing view of a trust score.
///
/// Deliberately omits the raw score and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustSummary {
    /// Current tier.
    pub tier: TrustTier,
    /// Tier is `verified`.
    pub is_verified: bool,
    /// Tier is `trusted` or better.
    pub is_trusted: bool,
}

impl From<TrustTier> for TrustSummary {
    fn from(tier: TrustTier) -> Self {
        Self {
            tier,
            is_verified: tier == TrustTier::Verified,
            is_trusted: tier >= TrustTier::Trusted,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Rate Limiting
// ═══════════════════════════════════════════════════════════

/// Sliding-window state for one (player, action) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitState {
    /// Player.
    pub user_id: UserId,
    /// Action name.
    pub action: String,
    /// Accepted request timestamps inside the window (ms).
    pub requests: Vec<i64>,
    /// Last accepted request (ms). Cooldown is anchored here.
    pub last_request: i64,
    /// Denied attempt timestamps inside the window (ms).
    #[serde(default)]
    pub rejected: Vec<i64>,
    /// Last attempt of any kind (ms). Retention is measured from here.
    pub last_attempt: i64,
}

/// Result of `CheckRateLimit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitDecision {
    /// Whether the gated action may proceed.
    pub allowed: bool,
    /// Seconds to wait before retrying, when denied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_seconds: Option<u64>,
    /// Requests left in the current window, when allowed under a rule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u32>,
}

impl RateLimitDecision {
    /// Allowed without a configured limit.
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            allowed: true,
            wait_seconds: None,
            remaining: None,
        }
    }

    /// Allowed with `remaining` requests left.
    #[must_use]
    pub const fn allow(remaining: u32) -> Self {
        Self {
            allowed: true,
            wait_seconds: None,
            remaining: Some(remaining),
        }
    }

    /// Denied for `wait_seconds`.
    #[must_use]
    pub const fn deny(wait_seconds: u64) -> Self {
        Self {
            allowed: false,
            wait_seconds: Some(wait_seconds),
            remaining: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Enforcement
// ═══════════════════════════════════════════════════════════

/// Ban duration class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BanKind {
    /// Expires at `expires_at`.
    Temporary,
    /// Never expires.
    Permanent,
}

/// Restriction placed on an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanRecord {
    /// Duration class.
    pub kind: BanKind,
    /// Why it was issued.
    pub reason: String,
    /// When it was issued.
    pub issued_at: DateTime<Utc>,
    /// Expiry, `None` for permanent bans.
    pub expires_at: Option<DateTime<Utc>>,
}

impl BanRecord {
    /// Active iff permanent, or temporary and `now < expires_at`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self.kind {
            BanKind::Permanent => true,
            BanKind::Temporary => self.expires_at.is_some_and(|expires_at| now < expires_at),
        }
    }
}

/// Informational warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningRecord {
    /// Why it was issued.
    pub reason: String,
    /// When it was issued.
    pub issued_at: DateTime<Utc>,
}

/// Restriction fields of a player's account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Owner.
    pub user_id: UserId,
    /// Current or most recent ban.
    pub ban: Option<BanRecord>,
    /// Warnings, oldest first.
    pub warnings: Vec<WarningRecord>,
}

impl AccountRecord {
    /// Account with no restrictions.
    #[must_use]
    pub const fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            ban: None,
            warnings: Vec::new(),
        }
    }

    /// Derived restriction state at `now`.
    ///
    /// An expired temporary ban reverts the account to unrestricted; only
    /// warnings issued after that expiry make it warned again.
    #[must_use]
    pub fn status(&self, now: DateTime<Utc>) -> RestrictionStatus {
        let warned_since = |since: Option<DateTime<Utc>>| {
            self.warnings
                .iter()
                .any(|warning| since.is_none_or(|since| warning.issued_at >= since))
        };

        match &self.ban {
            Some(ban) if ban.kind == BanKind::Permanent => RestrictionStatus::PermBanned,
            Some(ban) if ban.is_active(now) => RestrictionStatus::TempBanned {
                until: ban.expires_at.unwrap_or(now),
            },
            Some(ban) if warned_since(ban.expires_at) => RestrictionStatus::Warned,
            None if warned_since(None) => RestrictionStatus::Warned,
            _ => RestrictionStatus::Unrestricted,
        }
    }
}

/// Account restriction state.
///
/// `Unrestricted → Warned → TempBanned → PermBanned`; a temporary ban
/// reverts on its own once it expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RestrictionStatus {
    /// No restriction.
    Unrestricted,
    /// Warned at least once; informational.
    Warned,
    /// Banned until `until`.
    TempBanned {
        /// Expiry.
        until: DateTime<Utc>,
    },
    /// Banned permanently.
    PermBanned,
}

impl RestrictionStatus {
    /// Whether gameplay should be blocked.
    #[must_use]
    pub const fn is_banned(&self) -> bool {
        matches!(self, Self::TempBanned { .. } | Self::PermBanned)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn record(ts: i64) -> LocationRecord {
        LocationRecord::from_report(&LocationReport::new(1.0, 2.0, 5.0, ts), true)
    }

    #[test]
    fn test_history_evicts_oldest_first() {
        let mut history = UserLocationHistory::new(UserId::from("p1"));
        for ts in 0..105 {
            history.push_capped(record(ts), 100);
        }
        assert_eq!(history.records.len(), 100);
        assert_eq!(history.records[0].timestamp, 5);
        assert_eq!(history.last().unwrap().timestamp, 104);
        assert_eq!(history.recent(3).len(), 3);
        assert_eq!(history.recent(3)[0].timestamp, 102);
    }

    #[test]
    fn test_device_info_is_lenient() {
        let parsed = DeviceInfo::from_json(&json!({
            "isEmulator": true,
            "is_jailbroken": true,
            "mockLocationsEnabled": "yes",
            "developer_options_enabled": 1,
        }))
        .unwrap();

        assert!(parsed.is_emulator);
        assert!(parsed.is_rooted);
        assert!(!parsed.mock_locations_enabled);
        assert!(!parsed.developer_options_enabled);

        assert_eq!(DeviceInfo::from_json(&json!("garbage")), None);
        assert_eq!(DeviceInfo::from_json(&json!(null)), None);
        assert_eq!(DeviceInfo::from_json(&json!({})), Some(DeviceInfo::default()));
    }

    #[test]
    fn test_restriction_status_transitions() {
        let now = Utc::now();
        let mut account = AccountRecord::new(UserId::from("p1"));
        assert_eq!(account.status(now), RestrictionStatus::Unrestricted);

        account.warnings.push(WarningRecord {
            reason: "first".into(),
            issued_at: now,
        });
        assert_eq!(account.status(now), RestrictionStatus::Warned);

        let until = now + Duration::days(7);
        account.ban = Some(BanRecord {
            kind: BanKind::Temporary,
            reason: "auto".into(),
            issued_at: now,
            expires_at: Some(until),
        });
        assert_eq!(account.status(now), RestrictionStatus::TempBanned { until });
        assert!(account.status(now).is_banned());

        // Auto-reverts once the ban expires.
        assert_eq!(account.status(until), RestrictionStatus::Unrestricted);

        account.warnings.push(WarningRecord {
            reason: "after the ban".into(),
            issued_at: until + Duration::hours(1),
        });
        assert_eq!(account.status(until + Duration::hours(2)), RestrictionStatus::Warned);

        account.ban = Some(BanRecord {
            kind: BanKind::Permanent,
            reason: "admin".into(),
            issued_at: now,
            expires_at: None,
        });
        assert_eq!(account.status(until + Duration::days(365)), RestrictionStatus::PermBanned);
    }

    #[test]
    fn test_trust_summary_hides_raw_score() {
        let summary = TrustSummary::from(TrustTier::Trusted);
        assert!(summary.is_trusted);
        assert!(!summary.is_verified);

        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json, json!({"tier": "trusted", "is_verified": false, "is_trusted": true}));
    }

    #[test]
    fn test_caller_requirements() {
        use crate::error::EngineError;

        assert_eq!(Caller::anonymous().require_user(), Err(EngineError::Unauthenticated));
        assert_eq!(
            Caller::authenticated("", &[]).require_user(),
            Err(EngineError::Unauthenticated)
        );

        let player = Caller::authenticated("p1", &[]);
        assert_eq!(player.require_user(), Ok(&UserId::from("p1")));
        assert!(matches!(
            player.require_admin(),
            Err(EngineError::PermissionDenied { .. })
        ));

        let admin = Caller::authenticated("ops", &["moderator", "admin"]);
        assert_eq!(admin.require_admin(), Ok(&UserId::from("ops")));
    }

    #[test]
    fn test_rate_limit_decision_serialization_omits_absent_fields() {
        let json = serde_json::to_value(RateLimitDecision::deny(12)).unwrap();
        assert_eq!(json, json!({"allowed": false, "wait_seconds": 12}));
    }
}
