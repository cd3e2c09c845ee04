//! Router tests over in-memory stores.

#![allow(clippy::unwrap_used)]

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use geoguard_core::environment::Clock;
use geoguard_engine::mocks::{InMemoryEnvironment, OutageSwitch};
use geoguard_engine::model::{LocationValidation, RateLimitDecision, SuspiciousActivity, TrustSummary};
use geoguard_engine::EngineConfig;
use geoguard_testing::fixtures::{NEW_YORK, SAN_FRANCISCO};
use geoguard_testing::{init_test_tracing, test_clock, MockClock};
use geoguard_web::{router, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const USER: HeaderName = HeaderName::from_static("x-authenticated-user");
const CLAIMS: HeaderName = HeaderName::from_static("x-auth-claims");

fn server() -> (TestServer, MockClock, OutageSwitch) {
    init_test_tracing();
    let clock = MockClock::from(test_clock());
    let outage = OutageSwitch::new();
    let env = InMemoryEnvironment::with_outage(EngineConfig::default(), Arc::new(clock.clone()), &outage);
    let app = router(AppState::new(Arc::new(env)));
    (TestServer::new(app).unwrap(), clock, outage)
}

fn location(point: (f64, f64), accuracy: f64, timestamp: i64) -> Value {
    json!({
        "latitude": point.0,
        "longitude": point.1,
        "accuracy": accuracy,
        "timestamp": timestamp,
        "source": "gps",
    })
}

#[tokio::test]
async fn test_health() {
    let (server, _, _) = server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "ok");
}

#[tokio::test]
async fn test_validate_requires_identity() {
    let (server, clock, _) = server();

    let response = server
        .post("/v1/location/validate")
        .json(&json!({ "location": location(SAN_FRANCISCO, 5.0, clock.now_millis()) }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_validate_with_lenient_device_info() {
    let (server, clock, _) = server();

    let response = server
        .post("/v1/location/validate")
        .add_header(USER, HeaderValue::from_static("player-1"))
        .json(&json!({
            "location": location(SAN_FRANCISCO, 5.0, clock.now_millis()),
            "device_info": { "isEmulator": true, "is_rooted": "yes", "unknown": 1 },
        }))
        .await;

    response.assert_status_ok();
    let verdict: LocationValidation = response.json();
    assert_eq!(verdict.risk_score, 25);
    assert!(verdict.has_flag("EMULATOR_DETECTED"));
    assert!(!verdict.has_flag("ROOTED_DEVICE"));
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let (server, _, _) = server();

    let response = server
        .post("/v1/location/validate")
        .add_header(USER, HeaderValue::from_static("player-1"))
        .json(&json!({ "location": { "latitude": "north" } }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_identity_is_checked_before_the_body() {
    let (server, _, _) = server();

    let anonymous = server
        .post("/v1/location/validate")
        .json(&json!({ "location": { "latitude": "north" } }))
        .await;
    anonymous.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.json::<Value>()["code"], "UNAUTHENTICATED");

    let not_admin = server
        .post("/v1/admin/activities/any/review")
        .add_header(USER, HeaderValue::from_static("player-1"))
        .json(&json!({ "action": "obliterate" }))
        .await;
    not_admin.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(not_admin.json::<Value>()["code"], "PERMISSION_DENIED");
}

#[tokio::test]
async fn test_rate_limit_and_trust() {
    let (server, _, _) = server();

    for _ in 0..5 {
        server
            .post("/v1/rate-limit/check")
            .add_header(USER, HeaderValue::from_static("player-1"))
            .json(&json!({ "action": "capture_territory" }))
            .await
            .assert_status_ok();
    }

    let denied: RateLimitDecision = server
        .post("/v1/rate-limit/check")
        .add_header(USER, HeaderValue::from_static("player-1"))
        .json(&json!({ "action": "capture_territory" }))
        .await
        .json();
    assert!(!denied.allowed);
    assert_eq!(denied.wait_seconds, Some(60));

    let summary: TrustSummary = server
        .get("/v1/trust-score")
        .add_header(USER, HeaderValue::from_static("player-1"))
        .await
        .json();
    assert!(!summary.is_trusted);
}

#[tokio::test]
async fn test_admin_review_flow() {
    let (server, clock, _) = server();

    for point in [SAN_FRANCISCO, NEW_YORK] {
        server
            .post("/v1/location/validate")
            .add_header(USER, HeaderValue::from_static("player-1"))
            .json(&json!({ "location": location(point, 5.0, clock.now_millis()) }))
            .await
            .assert_status_ok();
        clock.advance(Duration::from_secs(60));
    }

    server
        .get("/v1/admin/activities/pending")
        .add_header(USER, HeaderValue::from_static("player-1"))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let pending: Vec<SuspiciousActivity> = server
        .get("/v1/admin/activities/pending")
        .add_header(USER, HeaderValue::from_static("moderator-1"))
        .add_header(CLAIMS, HeaderValue::from_static("admin"))
        .await
        .json();
    assert_eq!(pending.len(), 1);

    let path = format!("/v1/admin/activities/{}/review", pending[0].id);
    let review = json!({ "action": "temp_ban", "reason": "confirmed teleport" });

    let reviewed: SuspiciousActivity = server
        .post(&path)
        .add_header(USER, HeaderValue::from_static("moderator-1"))
        .add_header(CLAIMS, HeaderValue::from_static("admin"))
        .json(&review)
        .await
        .json();
    assert!(reviewed.reviewed);

    let again = server
        .post(&path)
        .add_header(USER, HeaderValue::from_static("moderator-1"))
        .add_header(CLAIMS, HeaderValue::from_static("admin"))
        .json(&review)
        .await;
    again.assert_status(StatusCode::CONFLICT);
    assert_eq!(again.json::<Value>()["code"], "ALREADY_REVIEWED");

    server
        .post("/v1/admin/activities/missing/review")
        .add_header(USER, HeaderValue::from_static("moderator-1"))
        .add_header(CLAIMS, HeaderValue::from_static("admin"))
        .json(&review)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_outage_fails_open_or_reports_unavailable() {
    let (server, clock, outage) = server();
    outage.take_down();

    let verdict: LocationValidation = server
        .post("/v1/location/validate")
        .add_header(USER, HeaderValue::from_static("player-1"))
        .json(&json!({ "location": location(SAN_FRANCISCO, 5.0, clock.now_millis()) }))
        .await
        .json();
    assert!(verdict.degraded);

    server
        .get("/v1/trust-score")
        .add_header(USER, HeaderValue::from_static("player-1"))
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}
