//! Location report validation.
//!
//! A report is scored by a fixed sequence of checks, each adding risk and
//! flags:
//!
//! 1. coordinate sanity and accuracy radius
//! 2. client clock skew
//! 3. implied speed since the last stored point
//! 4. zigzag movement over the recent path
//! 5. device integrity
//!
//! The scoring itself is pure; it runs inside the optimistic update of the
//! player's history so that concurrent reports are judged against each other.
//! Evidence capture and trust adjustment follow the write in a separate
//! settle step and never fail the verdict.

use crate::activity::SuspiciousActivityLog;
use crate::audit;
use crate::config::EngineConfig;
use crate::constants::{factors, flags};
use crate::environment::Environment;
use crate::error::Result;
use crate::geo::{bearing_change, bearing_degrees, distance_meters, is_valid_coordinate};
use crate::model::{
    ActivityType, DeviceInfo, LocationRecord, LocationReport, LocationValidation, Severity,
    UserId, UserLocationHistory, ValidationFlag,
};
use crate::providers::update_versioned;
use crate::trust::TrustScoreManager;
use chrono::{DateTime, Utc};
use geoguard_runtime::metrics::ValidationMetrics;
use serde_json::json;
use std::sync::Arc;

/// Evidence to be captured once the history write has succeeded.
#[derive(Debug, Clone, PartialEq)]
struct Finding {
    activity_type: ActivityType,
    severity: Severity,
    description: String,
    evidence: serde_json::Value,
}

/// Outcome of the pure scoring pass.
#[derive(Debug, Clone, PartialEq)]
struct Assessment {
    now: DateTime<Utc>,
    risk: u32,
    flags: Vec<ValidationFlag>,
    findings: Vec<Finding>,
    persist: bool,
}

impl Assessment {
    const fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            risk: 0,
            flags: Vec::new(),
            findings: Vec::new(),
            persist: true,
        }
    }

    fn flag(&mut self, code: &str, severity: Severity, risk: u32, message: String) {
        self.risk = self.risk.saturating_add(risk);
        self.flags.push(ValidationFlag {
            code: code.to_string(),
            severity,
            message,
            timestamp: self.now,
        });
    }

    fn finding(
        &mut self,
        activity_type: ActivityType,
        severity: Severity,
        description: String,
        evidence: serde_json::Value,
    ) {
        self.findings.push(Finding {
            activity_type,
            severity,
            description,
            evidence,
        });
    }

    fn into_verdict(self, config: &EngineConfig, degraded: bool) -> LocationValidation {
        LocationValidation {
            is_valid: self.risk < config.validator.valid_below,
            confidence: 100u32.saturating_sub(self.risk),
            flags: self.flags,
            risk_score: self.risk,
            degraded,
        }
    }
}

/// Score `report` against the player's stored `history` (oldest first).
fn assess(
    config: &EngineConfig,
    history: &[LocationRecord],
    report: &LocationReport,
    device: Option<&DeviceInfo>,
    now: DateTime<Utc>,
) -> Assessment {
    let mut assessment = Assessment::new(now);

    let coordinates_valid = is_valid_coordinate(report.latitude, report.longitude);
    if !coordinates_valid {
        assessment.flag(
            flags::INVALID_COORDINATES,
            Severity::Critical,
            config.validator.teleport_risk,
            format!(
                "Coordinates ({}, {}) are not a position on Earth",
                report.latitude, report.longitude
            ),
        );
        assessment.persist = false;
    }

    check_accuracy(config, report, &mut assessment);
    check_clock_skew(config, report, &mut assessment);

    if coordinates_valid {
        if let Some(last) = history.last() {
            check_speed(config, last, report, &mut assessment);
        }
        check_pattern(config, history, &mut assessment);
    }

    if let Some(device) = device {
        check_device(config, device, &mut assessment);
    }

    assessment
}

fn check_accuracy(config: &EngineConfig, report: &LocationReport, assessment: &mut Assessment) {
    let accuracy = report.accuracy;
    if !accuracy.is_finite() || accuracy < 0.0 {
        assessment.flag(
            flags::INVALID_ACCURACY,
            Severity::High,
            config.severity_weights.weight(Severity::High),
            format!("Accuracy {accuracy} is not a valid radius"),
        );
    } else if accuracy > config.validator.max_accuracy_meters {
        assessment.flag(
            flags::LOW_ACCURACY,
            Severity::Low,
            config.validator.low_accuracy_risk,
            format!("Accuracy {accuracy:.0}m exceeds {:.0}m", config.validator.max_accuracy_meters),
        );
    }
}

fn check_clock_skew(config: &EngineConfig, report: &LocationReport, assessment: &mut Assessment) {
    let server_millis = assessment.now.timestamp_millis();
    let skew_millis = report.timestamp.saturating_sub(server_millis);
    if skew_millis <= config.validator.future_tolerance.num_milliseconds() {
        return;
    }

    let skew_seconds = skew_millis / 1000;
    // A future point would become the speed baseline and hide the next jump.
    assessment.persist = false;
    assessment.flag(
        flags::FUTURE_TIMESTAMP,
        Severity::High,
        config.severity_weights.weight(Severity::High),
        format!("Report is {skew_seconds}s ahead of server time"),
    );
    assessment.finding(
        ActivityType::TimeManipulation,
        Severity::High,
        format!("Client clock {skew_seconds}s ahead of server"),
        json!({
            "client_timestamp": report.timestamp,
            "server_timestamp": server_millis,
            "skew_seconds": skew_seconds,
        }),
    );
}

#[allow(clippy::cast_precision_loss)]
fn check_speed(
    config: &EngineConfig,
    last: &LocationRecord,
    report: &LocationReport,
    assessment: &mut Assessment,
) {
    let thresholds = &config.validator;
    let elapsed_millis = report.timestamp.saturating_sub(last.timestamp);

    if elapsed_millis < 0 {
        assessment.flag(
            flags::TIME_REGRESSION,
            Severity::Medium,
            config.severity_weights.weight(Severity::Medium),
            format!("Report is {}ms older than the previous one", -elapsed_millis),
        );
    }
    if elapsed_millis <= 0 {
        return;
    }

    let distance = distance_meters(last.latitude, last.longitude, report.latitude, report.longitude);
    let elapsed_seconds = elapsed_millis as f64 / 1000.0;
    let speed = distance / elapsed_seconds;

    if speed > thresholds.teleport_speed {
        assessment.flag(
            flags::TELEPORT_DETECTED,
            Severity::Critical,
            thresholds.teleport_risk,
            format!("Moved {distance:.0}m in {elapsed_seconds:.1}s ({speed:.0} m/s)"),
        );
        assessment.finding(
            ActivityType::Teleport,
            Severity::Critical,
            format!("Teleported {:.1}km in {elapsed_seconds:.1}s", distance / 1000.0),
            json!({
                "from": { "latitude": last.latitude, "longitude": last.longitude },
                "to": { "latitude": report.latitude, "longitude": report.longitude },
                "distance_meters": distance,
                "elapsed_seconds": elapsed_seconds,
                "speed_mps": speed,
            }),
        );
    } else if speed > thresholds.impossible_speed {
        assessment.flag(
            flags::IMPOSSIBLE_SPEED,
            Severity::High,
            thresholds.impossible_speed_risk,
            format!("Speed {speed:.0} m/s is not reachable on the ground"),
        );
    } else if speed > thresholds.high_speed {
        assessment.flag(
            flags::HIGH_SPEED,
            Severity::Medium,
            thresholds.high_speed_risk,
            format!("Speed {speed:.0} m/s is unusually high"),
        );
    }
}

#[allow(clippy::cast_precision_loss)]
fn check_pattern(config: &EngineConfig, history: &[LocationRecord], assessment: &mut Assessment) {
    let thresholds = &config.validator;
    if history.len() < thresholds.pattern_min_points {
        return;
    }

    let start = history.len().saturating_sub(thresholds.pattern_window);
    let bearings: Vec<f64> = history[start..]
        .windows(2)
        .map(|pair| {
            bearing_degrees(pair[0].latitude, pair[0].longitude, pair[1].latitude, pair[1].longitude)
        })
        .collect();

    let turns = bearings.len().saturating_sub(1);
    if turns == 0 {
        return;
    }

    let sharp = bearings
        .windows(2)
        .filter(|pair| {
            let change = bearing_change(pair[0], pair[1]);
            change > 90.0 && change < 270.0
        })
        .count();

    let ratio = sharp as f64 / turns as f64;
    if ratio > thresholds.zigzag_ratio {
        assessment.flag(
            flags::ZIGZAG_PATTERN,
            Severity::Medium,
            thresholds.zigzag_risk,
            format!("{sharp} of {turns} recent turns reverse direction"),
        );
    }
}

fn check_device(config: &EngineConfig, device: &DeviceInfo, assessment: &mut Assessment) {
    let weights = &config.severity_weights;
    let evidence = || serde_json::to_value(device).unwrap_or_default();

    if device.is_emulator {
        assessment.flag(
            flags::EMULATOR_DETECTED,
            Severity::Critical,
            weights.weight(Severity::Critical),
            "Client is running in an emulator".to_string(),
        );
        assessment.finding(
            ActivityType::Emulator,
            Severity::Critical,
            "Emulator detected".to_string(),
            evidence(),
        );
    }
    if device.is_rooted {
        assessment.flag(
            flags::ROOTED_DEVICE,
            Severity::High,
            weights.weight(Severity::High),
            "Device is rooted or jailbroken".to_string(),
        );
    }
    if device.mock_locations_enabled {
        assessment.flag(
            flags::MOCK_LOCATION,
            Severity::Critical,
            weights.weight(Severity::Critical),
            "Mock locations are enabled".to_string(),
        );
        assessment.finding(
            ActivityType::GpsSpoof,
            Severity::Critical,
            "Mock location provider enabled".to_string(),
            evidence(),
        );
    }
    if device.developer_options_enabled {
        assessment.flag(
            flags::DEVELOPER_OPTIONS,
            Severity::Low,
            weights.weight(Severity::Low),
            "Developer options are enabled".to_string(),
        );
    }
    if device.tampered_client {
        assessment.flag(
            flags::MODIFIED_CLIENT,
            Severity::Critical,
            weights.weight(Severity::Critical),
            "Client failed integrity attestation".to_string(),
        );
        assessment.finding(
            ActivityType::ModifiedClient,
            Severity::Critical,
            "Modified client detected".to_string(),
            evidence(),
        );
    }
}

/// A report whose history write has committed, awaiting its follow-up.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedReport {
    assessment: Assessment,
}

/// Scores position reports and maintains location histories.
pub struct LocationValidator<E: Environment> {
    env: Arc<E>,
}

impl<E: Environment> LocationValidator<E> {
    /// Create a validator over `env`.
    #[must_use]
    pub const fn new(env: Arc<E>) -> Self {
        Self { env }
    }

    /// Validate a report, append it to the player's history, capture evidence
    /// and penalise trust when risk is high.
    ///
    /// Malformed telemetry never errors: it produces a high-risk verdict.
    /// Reports with impossible coordinates or a future timestamp are not
    /// stored.
    ///
    /// # Errors
    ///
    /// Returns error only if the history store is unavailable or keeps
    /// conflicting. Nothing has been written in that case.
    pub async fn validate(
        &self,
        user_id: &UserId,
        report: &LocationReport,
        device: Option<&DeviceInfo>,
    ) -> Result<LocationValidation> {
        let recorded = self.record_report(user_id, report, device).await?;
        Ok(self.settle(user_id, recorded).await)
    }

    /// Score the report and append it to the player's history.
    ///
    /// This is the only step that writes location state. Once it returns
    /// `Ok` the report is committed and [`Self::settle`] should follow.
    ///
    /// # Errors
    ///
    /// Returns error if the history store is unavailable or keeps conflicting.
    pub async fn record_report(
        &self,
        user_id: &UserId,
        report: &LocationReport,
        device: Option<&DeviceInfo>,
    ) -> Result<RecordedReport> {
        let config = self.env.config();
        let now = self.env.clock().now();
        let cap = config.validator.history_cap;

        let assessment = update_versioned(
            self.env.histories(),
            user_id.as_str(),
            config.service.max_cas_attempts,
            |current: Option<UserLocationHistory>| {
                let mut history = current.unwrap_or_else(|| UserLocationHistory::new(user_id.clone()));
                let assessment = assess(config, &history.records, report, device, now);
                if !assessment.persist {
                    return (None, assessment);
                }

                let validated = assessment.risk < config.validator.record_valid_below;
                history.push_capped(LocationRecord::from_report(report, validated), cap);
                (Some(history), assessment)
            },
        )
        .await?;

        Ok(RecordedReport { assessment })
    }

    /// Capture evidence, penalise trust and produce the verdict for a
    /// committed report.
    ///
    /// Failures here are audited and never change the verdict.
    pub async fn settle(&self, user_id: &UserId, recorded: RecordedReport) -> LocationValidation {
        let config = self.env.config();
        let assessment = recorded.assessment;

        self.capture_evidence(user_id, &assessment.findings).await;

        if assessment.risk >= config.validator.trust_penalty_threshold {
            let delta = -i32::try_from(assessment.risk / 10).unwrap_or(i32::MAX);
            let penalty = TrustScoreManager::new(Arc::clone(&self.env))
                .update(user_id, delta, Some(factors::LOCATION_RISK))
                .await;
            if let Err(e) = penalty {
                audit::side_effect_failed("trust_penalty", user_id, &e);
            }
        }

        let verdict = assessment.into_verdict(config, false);
        ValidationMetrics::record(verdict.is_valid);

        tracing::info!(
            user_id = %user_id,
            risk_score = verdict.risk_score,
            is_valid = verdict.is_valid,
            flags = verdict.flags.len(),
            "Location validated"
        );

        verdict
    }

    /// Verdict from the checks that need no stored state.
    ///
    /// Used when the store is unreachable. Speed and movement checks are
    /// skipped, nothing is persisted, and the verdict is marked degraded.
    #[must_use]
    pub fn validate_stateless(&self, report: &LocationReport, device: Option<&DeviceInfo>) -> LocationValidation {
        let config = self.env.config();
        let verdict = assess(config, &[], report, device, self.env.clock().now()).into_verdict(config, true);
        ValidationMetrics::record(verdict.is_valid);
        verdict
    }

    async fn capture_evidence(&self, user_id: &UserId, findings: &[Finding]) {
        if findings.is_empty() {
            return;
        }

        let log = SuspiciousActivityLog::new(Arc::clone(&self.env));
        for finding in findings {
            let recorded = log
                .record(
                    user_id,
                    finding.activity_type,
                    finding.severity,
                    finding.description.clone(),
                    finding.evidence.clone(),
                )
                .await;
            if let Err(e) = recorded {
                audit::side_effect_failed("record_evidence", user_id, &e);
            }
        }
    }
}
