//! `GetTrustScore`.

use crate::extractors::CallerIdentity;
use crate::state::AppState;
use crate::WebResult;
use axum::{extract::State, Json};
use geoguard_engine::model::TrustSummary;
use geoguard_engine::Environment;

/// `GET /v1/trust-score`: the caller's own tier.
///
/// # Errors
///
/// 401 without caller identity, 503/504 when the store is unreachable.
pub async fn get_trust_score<E: Environment>(
    State(state): State<AppState<E>>,
    CallerIdentity(caller): CallerIdentity,
) -> WebResult<Json<TrustSummary>> {
    Ok(Json(state.service.get_trust_score(&caller).await?))
}
