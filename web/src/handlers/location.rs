//! `ValidateLocation`.

use crate::error::AppError;
use crate::extractors::{CallerIdentity, CorrelationId};
use crate::state::AppState;
use crate::WebResult;
use axum::extract::rejection::JsonRejection;
use axum::{extract::State, Json};
use geoguard_engine::model::{DeviceInfo, LocationReport, LocationValidation};
use geoguard_engine::Environment;
use serde::Deserialize;

/// Request body.
///
/// `device_info` is read leniently: unknown shapes and missing fields never
/// reject the request.
#[derive(Debug, Deserialize)]
pub struct ValidateLocationRequest {
    /// Reported position.
    pub location: LocationReport,
    /// Client device attributes, any JSON.
    #[serde(default)]
    pub device_info: serde_json::Value,
}

/// `POST /v1/location/validate`.
///
/// # Errors
///
/// 401 without caller identity, 400 for an unreadable body.
pub async fn validate_location<E: Environment>(
    State(state): State<AppState<E>>,
    CallerIdentity(caller): CallerIdentity,
    correlation_id: CorrelationId,
    payload: Result<Json<ValidateLocationRequest>, JsonRejection>,
) -> WebResult<Json<LocationValidation>> {
    caller.require_user()?;
    let Json(request) = payload.map_err(AppError::from)?;
    let device = DeviceInfo::from_json(&request.device_info);

    let verdict = state
        .service
        .validate_location(&caller, request.location, device)
        .await?;

    if !verdict.is_valid {
        tracing::info!(
            correlation_id = %correlation_id.0,
            risk_score = verdict.risk_score,
            "Location rejected"
        );
    }

    Ok(Json(verdict))
}
