//! Admin review queue.

use crate::error::AppError;
use crate::extractors::{CallerIdentity, CorrelationId};
use crate::state::AppState;
use crate::WebResult;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use geoguard_engine::model::{ActivityId, ReviewAction, SuspiciousActivity};
use geoguard_engine::Environment;
use serde::Deserialize;

/// Review request body.
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    /// Decision.
    pub action: ReviewAction,
    /// Note recorded with the review and used as the enforcement reason.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Pending queue query.
#[derive(Debug, Default, Deserialize)]
pub struct PendingQuery {
    /// Page size, capped by the server.
    pub limit: Option<usize>,
}

/// `POST /v1/admin/activities/:id/review`.
///
/// # Errors
///
/// 401/403 for non-admins, 404 for an unknown id, 409 if already reviewed.
pub async fn review_activity<E: Environment>(
    State(state): State<AppState<E>>,
    CallerIdentity(caller): CallerIdentity,
    correlation_id: CorrelationId,
    Path(id): Path<String>,
    payload: Result<Json<ReviewRequest>, JsonRejection>,
) -> WebResult<Json<SuspiciousActivity>> {
    caller.require_admin()?;
    let Json(request) = payload.map_err(AppError::from)?;
    let activity_id = ActivityId(id);

    let reviewed = state
        .service
        .review_suspicious_activity(&caller, &activity_id, request.action, request.reason)
        .await?;

    tracing::info!(
        correlation_id = %correlation_id.0,
        activity_id = %activity_id,
        action = %request.action,
        "Activity reviewed"
    );

    Ok(Json(reviewed))
}

/// `GET /v1/admin/activities/pending`.
///
/// # Errors
///
/// 401/403 for non-admins, 503/504 when the store is unreachable.
pub async fn list_pending<E: Environment>(
    State(state): State<AppState<E>>,
    CallerIdentity(caller): CallerIdentity,
    Query(query): Query<PendingQuery>,
) -> WebResult<Json<Vec<SuspiciousActivity>>> {
    Ok(Json(
        state.service.list_pending_activities(&caller, query.limit).await?,
    ))
}
