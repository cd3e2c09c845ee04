//! `CheckRateLimit`.

use crate::error::AppError;
use crate::extractors::CallerIdentity;
use crate::state::AppState;
use crate::WebResult;
use axum::extract::rejection::JsonRejection;
use axum::{extract::State, Json};
use geoguard_engine::model::RateLimitDecision;
use geoguard_engine::Environment;
use serde::Deserialize;

/// Request body.
#[derive(Debug, Deserialize)]
pub struct CheckRateLimitRequest {
    /// Gated action name, e.g. `attack`.
    pub action: String,
}

/// `POST /v1/rate-limit/check`.
///
/// # Errors
///
/// 401 without caller identity, 400 for an unreadable body.
pub async fn check_rate_limit<E: Environment>(
    State(state): State<AppState<E>>,
    CallerIdentity(caller): CallerIdentity,
    payload: Result<Json<CheckRateLimitRequest>, JsonRejection>,
) -> WebResult<Json<RateLimitDecision>> {
    let Json(request) = payload.map_err(AppError::from)?;
    let decision = state.service.check_rate_limit(&caller, &request.action).await?;
    Ok(Json(decision))
}
