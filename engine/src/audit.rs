//! Audit events.
//!
//! Emitted on the `geoguard::audit` tracing target so operators can route
//! them apart from ordinary logs and reconcile fail-open decisions after an
//! outage.

use crate::constants::targets::AUDIT;
use crate::error::EngineError;
use crate::model::UserId;
use geoguard_runtime::metrics::{EnforcementMetrics, FailOpenMetrics};

/// An operation was answered without consulting the store.
pub fn fail_open(operation: &'static str, user_id: &UserId, error: &EngineError) {
    FailOpenMetrics::record(operation);
    tracing::warn!(
        target: AUDIT,
        event = "fail_open",
        operation,
        user_id = %user_id,
        error = %error,
        "Store unavailable, failing open"
    );
}

/// A follow-up step of an otherwise successful operation failed.
///
/// The primary result is still returned to the caller.
pub fn side_effect_failed(step: &'static str, user_id: &UserId, error: &EngineError) {
    tracing::warn!(
        target: AUDIT,
        event = "side_effect_failed",
        step,
        user_id = %user_id,
        error = %error,
        "Follow-up step failed"
    );
}

/// A warning or ban was issued.
pub fn enforcement(kind: &'static str, user_id: &UserId, reason: &str) {
    EnforcementMetrics::record(kind);
    tracing::info!(
        target: AUDIT,
        event = "enforcement",
        kind,
        user_id = %user_id,
        reason,
        "Enforcement action issued"
    );
}

/// An admin reviewed a suspicious activity.
pub fn review(activity_id: &str, reviewer: &UserId, action: &str) {
    tracing::info!(
        target: AUDIT,
        event = "review",
        activity_id,
        reviewer = %reviewer,
        action,
        "Suspicious activity reviewed"
    );
}
