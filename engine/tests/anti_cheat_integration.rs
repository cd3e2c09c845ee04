//! End-to-end tests through the service facade over in-memory stores.

#![allow(clippy::unwrap_used)]

use geoguard_core::environment::Clock;
use geoguard_engine::config::{EngineConfig, ServiceConfig};
use geoguard_engine::constants::flags;
use geoguard_engine::mocks::{
    InMemoryActivityStore, InMemoryEnvironment, InMemoryRateLimitStore, InMemoryStore, OutageSwitch,
};
use geoguard_engine::model::{
    ActivityType, Caller, DeviceInfo, LocationReport, RateLimitDecision, RestrictionStatus,
    ReviewAction, TrustTier, UserId,
};
use geoguard_engine::providers::VersionedStore;
use geoguard_engine::trust::Escalation;
use geoguard_engine::{
    AntiCheatService, EngineError, EnforcementEngine, GuardEnvironment, TrustScoreManager,
};
use geoguard_testing::fixtures::{NEW_YORK, SAN_FRANCISCO};
use geoguard_testing::{init_test_tracing, test_clock, MockClock};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    service: AntiCheatService<InMemoryEnvironment>,
    env: Arc<InMemoryEnvironment>,
    clock: MockClock,
    outage: OutageSwitch,
}

fn harness_with(config: EngineConfig) -> Harness {
    init_test_tracing();
    let clock = MockClock::from(test_clock());
    let outage = OutageSwitch::new();
    let env = Arc::new(InMemoryEnvironment::with_outage(config, Arc::new(clock.clone()), &outage));
    Harness {
        service: AntiCheatService::new(Arc::clone(&env)),
        env,
        clock,
        outage,
    }
}

fn harness() -> Harness {
    harness_with(EngineConfig::default())
}

/// Switches for the stores written after an operation commits.
struct FollowUps {
    /// Suspicious activity log
    evidence: OutageSwitch,
    /// Trust scores and accounts
    enforcement: OutageSwitch,
}

/// Harness with a 50ms call budget whose history and rate-limit stores obey
/// `outage`, and whose remaining stores obey their own switches.
fn split_harness() -> (Harness, FollowUps) {
    init_test_tracing();
    let clock = MockClock::from(test_clock());
    let outage = OutageSwitch::new();
    let follow_ups = FollowUps {
        evidence: OutageSwitch::new(),
        enforcement: OutageSwitch::new(),
    };
    let config = EngineConfig::default()
        .with_service(ServiceConfig::default().with_call_timeout(Duration::from_millis(50)));

    let env = Arc::new(GuardEnvironment::new(
        InMemoryStore::with_outage(outage.clone()),
        InMemoryStore::with_outage(follow_ups.enforcement.clone()),
        InMemoryRateLimitStore::with_outage(outage.clone()),
        InMemoryActivityStore::with_outage(follow_ups.evidence.clone()),
        InMemoryStore::with_outage(follow_ups.enforcement.clone()),
        Arc::new(clock.clone()),
        Arc::new(config),
    ));

    let harness = Harness {
        service: AntiCheatService::new(Arc::clone(&env)),
        env,
        clock,
        outage,
    };
    (harness, follow_ups)
}

fn player() -> Caller {
    Caller::authenticated("player-1", &[])
}

fn admin() -> Caller {
    Caller::authenticated("moderator-1", &["admin"])
}

fn report_at(clock: &MockClock, point: (f64, f64), accuracy: f64) -> LocationReport {
    LocationReport::new(point.0, point.1, accuracy, clock.now_millis())
}

// ═══════════════════════════════════════════════════════════
// Location validation
// ═══════════════════════════════════════════════════════════

#[tokio::test]
async fn test_cross_country_jump_is_a_teleport() {
    let h = harness();

    let first = h
        .service
        .validate_location(&player(), report_at(&h.clock, SAN_FRANCISCO, 10.0), None)
        .await
        .unwrap();
    assert!(first.is_valid);
    assert_eq!(first.confidence, 100);

    h.clock.advance(Duration::from_secs(60));
    let second = h
        .service
        .validate_location(&player(), report_at(&h.clock, NEW_YORK, 10.0), None)
        .await
        .unwrap();

    assert!(!second.is_valid);
    assert_eq!(second.risk_score, 50);
    assert_eq!(second.confidence, 50);
    assert!(!second.degraded);
    let codes: Vec<_> = second.flags.iter().map(|f| f.code.as_str()).collect();
    assert_eq!(codes, vec![flags::TELEPORT_DETECTED]);

    let evidence = h.env.activities.all();
    assert_eq!(evidence.len(), 1);
    assert_eq!(evidence[0].activity_type, ActivityType::Teleport);
    assert!(evidence[0].evidence["distance_meters"].as_f64().unwrap() > 4_000_000.0);

    let trust = TrustScoreManager::new(Arc::clone(&h.env))
        .get(&UserId::from("player-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(trust.score, 45);
    assert_eq!(trust.violations, 1);
}

#[tokio::test]
async fn test_coarse_fix_without_history() {
    let h = harness();

    let verdict = h
        .service
        .validate_location(&player(), report_at(&h.clock, SAN_FRANCISCO, 150.0), None)
        .await
        .unwrap();

    assert!(verdict.is_valid);
    assert_eq!(verdict.risk_score, 5);
    assert_eq!(verdict.confidence, 95);
    assert!(verdict.has_flag(flags::LOW_ACCURACY));
    assert!(h.env.activities.all().is_empty());
}

#[tokio::test]
async fn test_emulator_with_mock_locations() {
    let h = harness();
    let device = DeviceInfo {
        is_emulator: true,
        mock_locations_enabled: true,
        ..DeviceInfo::default()
    };

    let verdict = h
        .service
        .validate_location(&player(), report_at(&h.clock, SAN_FRANCISCO, 10.0), Some(device))
        .await
        .unwrap();

    assert!(!verdict.is_valid);
    assert_eq!(verdict.risk_score, 50);
    assert!(verdict.has_flag(flags::EMULATOR_DETECTED));
    assert!(verdict.has_flag(flags::MOCK_LOCATION));

    let kinds: Vec<_> = h.env.activities.all().iter().map(|a| a.activity_type).collect();
    assert_eq!(kinds, vec![ActivityType::Emulator, ActivityType::GpsSpoof]);
}

#[tokio::test]
async fn test_impossible_coordinates_are_not_stored() {
    let h = harness();

    let verdict = h
        .service
        .validate_location(
            &player(),
            LocationReport::new(123.0, 10.0, 5.0, h.clock.now_millis()),
            None,
        )
        .await
        .unwrap();

    assert!(!verdict.is_valid);
    assert!(verdict.has_flag(flags::INVALID_COORDINATES));
    assert!(h.env.histories.is_empty());
}

// ═══════════════════════════════════════════════════════════
// Rate limiting
// ═══════════════════════════════════════════════════════════

#[tokio::test]
async fn test_attack_quota() {
    let h = harness();

    for _ in 0..10 {
        assert!(h.service.check_rate_limit(&player(), "attack").await.unwrap().allowed);
    }

    let denied = h.service.check_rate_limit(&player(), "attack").await.unwrap();
    assert!(!denied.allowed);
    assert_eq!(denied.wait_seconds, Some(30));

    let other_player = Caller::authenticated("player-2", &[]);
    assert!(h.service.check_rate_limit(&other_player, "attack").await.unwrap().allowed);

    assert_eq!(
        h.service.check_rate_limit(&player(), "emote").await.unwrap(),
        RateLimitDecision::unlimited()
    );
}

// ═══════════════════════════════════════════════════════════
// Trust and enforcement
// ═══════════════════════════════════════════════════════════

#[tokio::test]
async fn test_new_player_is_neutral() {
    let h = harness();
    let summary = h.service.get_trust_score(&player()).await.unwrap();
    assert_eq!(summary.tier, TrustTier::Neutral);
    assert!(!summary.is_trusted);
    assert!(!summary.is_verified);
}

#[tokio::test]
async fn test_repeated_violations_escalate_to_temp_ban() {
    let h = harness();
    let trust = TrustScoreManager::new(Arc::clone(&h.env));
    let enforcement = EnforcementEngine::new(Arc::clone(&h.env));
    let user = UserId::from("player-1");

    let mut escalations = Vec::new();
    for _ in 0..5 {
        escalations.push(trust.update(&user, -10, Some("location_risk")).await.unwrap().escalation);
    }
    assert_eq!(
        escalations,
        vec![
            Escalation::None,
            Escalation::None,
            Escalation::None,
            Escalation::Warning,
            Escalation::TempBan,
        ]
    );

    let record = trust.get(&user).await.unwrap().unwrap();
    assert_eq!(record.score, 0);
    assert_eq!(record.warnings, 1);
    assert_eq!(record.temp_bans, 1);
    assert!(enforcement.is_restricted(&user).await.unwrap());

    h.clock.advance(Duration::from_secs(7 * 24 * 60 * 60));
    assert!(!enforcement.is_restricted(&user).await.unwrap());
}

// ═══════════════════════════════════════════════════════════
// Review
// ═══════════════════════════════════════════════════════════

#[tokio::test]
async fn test_activity_can_only_be_reviewed_once() {
    let h = harness();

    h.service
        .validate_location(&player(), report_at(&h.clock, SAN_FRANCISCO, 10.0), None)
        .await
        .unwrap();
    h.clock.advance(Duration::from_secs(60));
    h.service
        .validate_location(&player(), report_at(&h.clock, NEW_YORK, 10.0), None)
        .await
        .unwrap();

    let pending = h.service.list_pending_activities(&admin(), None).await.unwrap();
    assert_eq!(pending.len(), 1);
    let id = pending[0].id.clone();

    let reviewed = h
        .service
        .review_suspicious_activity(&admin(), &id, ReviewAction::Warning, Some("confirmed".into()))
        .await
        .unwrap();
    assert!(reviewed.reviewed);
    assert_eq!(reviewed.action, Some(ReviewAction::Warning));
    assert_eq!(reviewed.reviewed_by, Some(UserId::from("moderator-1")));

    let again = h
        .service
        .review_suspicious_activity(&admin(), &id, ReviewAction::PermBan, None)
        .await;
    assert_eq!(again, Err(EngineError::AlreadyReviewed(id.to_string())));

    let status = EnforcementEngine::new(Arc::clone(&h.env))
        .restriction_status(&UserId::from("player-1"))
        .await
        .unwrap();
    assert_eq!(status, RestrictionStatus::Warned);
    assert!(h.service.list_pending_activities(&admin(), None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_caller_checks() {
    let h = harness();

    let anonymous = h
        .service
        .validate_location(&Caller::anonymous(), report_at(&h.clock, SAN_FRANCISCO, 10.0), None)
        .await;
    assert_eq!(anonymous, Err(EngineError::Unauthenticated));

    let not_admin = h.service.list_pending_activities(&player(), None).await;
    assert_eq!(
        not_admin,
        Err(EngineError::PermissionDenied {
            required: "admin".into()
        })
    );

    let missing = h
        .service
        .review_suspicious_activity(&admin(), &"no-such-id".into(), ReviewAction::Dismissed, None)
        .await;
    assert_eq!(missing, Err(EngineError::ActivityNotFound("no-such-id".into())));
}

// ═══════════════════════════════════════════════════════════
// Store failures
// ═══════════════════════════════════════════════════════════

#[tokio::test]
async fn test_store_outage_fails_open() {
    let h = harness();
    h.outage.take_down();

    let verdict = h
        .service
        .validate_location(&player(), report_at(&h.clock, SAN_FRANCISCO, 150.0), None)
        .await
        .unwrap();
    assert!(verdict.degraded);
    assert_eq!(verdict.risk_score, 5);

    let decision = h.service.check_rate_limit(&player(), "attack").await.unwrap();
    assert_eq!(decision, RateLimitDecision::unlimited());

    let trust = h.service.get_trust_score(&player()).await;
    assert!(matches!(trust, Err(EngineError::StoreUnavailable(_))));
}

#[tokio::test]
async fn test_slow_store_times_out_and_fails_open() {
    let h = harness_with(
        EngineConfig::default()
            .with_service(ServiceConfig::default().with_call_timeout(Duration::from_millis(50))),
    );
    h.outage.set_latency(Duration::from_millis(200));

    let decision = h.service.check_rate_limit(&player(), "attack").await.unwrap();
    assert!(decision.allowed);

    let trust = h.service.get_trust_score(&player()).await;
    assert_eq!(trust, Err(EngineError::Timeout));
}

#[tokio::test]
async fn test_slow_evidence_does_not_discard_committed_verdict() {
    let (h, follow_ups) = split_harness();
    follow_ups.evidence.set_latency(Duration::from_millis(150));
    follow_ups.enforcement.set_latency(Duration::from_millis(150));

    h.service
        .validate_location(&player(), report_at(&h.clock, SAN_FRANCISCO, 10.0), None)
        .await
        .unwrap();
    h.clock.advance(Duration::from_secs(60));
    let verdict = h
        .service
        .validate_location(&player(), report_at(&h.clock, NEW_YORK, 10.0), None)
        .await
        .unwrap();

    assert!(!verdict.degraded);
    assert_eq!(verdict.risk_score, 50);
    assert!(verdict.has_flag(flags::TELEPORT_DETECTED));

    let history = h.env.histories.load("player-1").await.unwrap().unwrap();
    assert_eq!(history.value.records.len(), 2);

    let kinds: Vec<_> = h.env.activities.all().iter().map(|a| a.activity_type).collect();
    assert_eq!(kinds, vec![ActivityType::Teleport]);

    let trust = TrustScoreManager::new(Arc::clone(&h.env))
        .get(&UserId::from("player-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(trust.score, 45);
}

#[tokio::test]
async fn test_slow_abuse_logging_keeps_denial() {
    let (h, follow_ups) = split_harness();
    follow_ups.evidence.set_latency(Duration::from_millis(150));

    for _ in 0..15 {
        h.service.check_rate_limit(&player(), "attack").await.unwrap();
    }

    let crossing = h.service.check_rate_limit(&player(), "attack").await.unwrap();
    assert!(!crossing.allowed);
    assert_eq!(crossing.wait_seconds, Some(30));

    let kinds: Vec<_> = h.env.activities.all().iter().map(|a| a.activity_type).collect();
    assert_eq!(kinds, vec![ActivityType::RateAbuse]);

    assert!(!h.service.check_rate_limit(&player(), "attack").await.unwrap().allowed);
}

#[tokio::test]
async fn test_slow_enforcement_still_applies_review() {
    let (h, follow_ups) = split_harness();

    h.service
        .validate_location(&player(), report_at(&h.clock, SAN_FRANCISCO, 10.0), None)
        .await
        .unwrap();
    h.clock.advance(Duration::from_secs(60));
    h.service
        .validate_location(&player(), report_at(&h.clock, NEW_YORK, 10.0), None)
        .await
        .unwrap();

    let pending = h.service.list_pending_activities(&admin(), None).await.unwrap();
    assert_eq!(pending.len(), 1);

    follow_ups.enforcement.set_latency(Duration::from_millis(150));
    let reviewed = h
        .service
        .review_suspicious_activity(&admin(), &pending[0].id, ReviewAction::TempBan, None)
        .await
        .unwrap();
    assert!(reviewed.reviewed);
    assert_eq!(reviewed.action, Some(ReviewAction::TempBan));

    let status = EnforcementEngine::new(Arc::clone(&h.env))
        .restriction_status(&UserId::from("player-1"))
        .await
        .unwrap();
    assert!(matches!(status, RestrictionStatus::TempBanned { .. }));
}

#[tokio::test]
async fn test_single_blip_is_retried() {
    let h = harness();
    h.outage.fail_next(1);

    let verdict = h
        .service
        .validate_location(&player(), report_at(&h.clock, SAN_FRANCISCO, 10.0), None)
        .await
        .unwrap();
    assert!(!verdict.degraded);
    assert_eq!(h.env.histories.len(), 1);
}

// ═══════════════════════════════════════════════════════════
// Concurrency
// ═══════════════════════════════════════════════════════════

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reports_are_all_recorded() {
    let service = ServiceConfig {
        max_cas_attempts: 64,
        ..ServiceConfig::default()
    };
    let h = harness_with(EngineConfig::default().with_service(service));

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let service = h.service.clone();
            let report = report_at(&h.clock, SAN_FRANCISCO, 10.0);
            tokio::spawn(async move { service.validate_location(&player(), report, None).await })
        })
        .collect();

    for task in futures::future::join_all(tasks).await {
        assert!(!task.unwrap().unwrap().degraded);
    }

    let history = h.env.histories.load("player-1").await.unwrap().unwrap();
    assert_eq!(history.value.records.len(), 16);
}
