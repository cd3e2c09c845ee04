//! HTTP surface for the GeoGuard engine.
//!
//! Thin axum shell over [`geoguard_engine::AntiCheatService`]: handlers
//! extract the caller and payload, call the facade and map the result.
//!
//! # Routes
//!
//! | Method | Path | Caller |
//! |---|---|---|
//! | `POST` | `/v1/location/validate` | player |
//! | `POST` | `/v1/rate-limit/check` | player |
//! | `GET` | `/v1/trust-score` | player |
//! | `GET` | `/v1/admin/activities/pending` | admin |
//! | `POST` | `/v1/admin/activities/:id/review` | admin |
//! | `GET` | `/health` | anyone |
//!
//! Caller identity comes from the `X-Authenticated-User` and `X-Auth-Claims`
//! headers set by the upstream gateway.

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod state;

use axum::routing::{get, post};
use axum::Router;
use geoguard_engine::Environment;
use tower_http::trace::TraceLayer;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{CallerIdentity, CorrelationId, CLAIMS_HEADER, USER_HEADER};
pub use middleware::{correlation_id_layer, CORRELATION_ID_HEADER};
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;

/// Build the application router.
pub fn router<E: Environment>(state: AppState<E>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/v1/location/validate",
            post(handlers::location::validate_location::<E>),
        )
        .route(
            "/v1/rate-limit/check",
            post(handlers::rate_limit::check_rate_limit::<E>),
        )
        .route("/v1/trust-score", get(handlers::trust::get_trust_score::<E>))
        .route(
            "/v1/admin/activities/pending",
            get(handlers::admin::list_pending::<E>),
        )
        .route(
            "/v1/admin/activities/:id/review",
            post(handlers::admin::review_activity::<E>),
        )
        .layer(TraceLayer::new_for_http())
        .layer(correlation_id_layer())
        .with_state(state)
}
