//! Liveness endpoint.

use axum::http::StatusCode;

/// `GET /health`.
///
/// Reports that the process is serving. Store reachability is not checked:
/// the engine fails open while the store is down, so the service stays live.
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}
