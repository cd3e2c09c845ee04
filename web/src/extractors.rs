//! Request extractors.
//!
//! - [`CallerIdentity`]: caller identity forwarded by the upstream gateway
//! - [`CorrelationId`]: id assigned by [`crate::middleware::correlation_id_layer`]
//!
//! Identity is never rejected here. A request without identity extracts an
//! anonymous caller and the engine answers `Unauthenticated`.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use geoguard_engine::model::Caller;
use uuid::Uuid;

/// Header carrying the authenticated user id.
pub const USER_HEADER: &str = "X-Authenticated-User";

/// Header carrying comma-separated claims.
pub const CLAIMS_HEADER: &str = "X-Auth-Claims";

/// Caller identity from gateway headers.
#[derive(Debug, Clone)]
pub struct CallerIdentity(pub Caller);

#[async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(caller_from_headers(&parts.headers)))
    }
}

fn caller_from_headers(headers: &HeaderMap) -> Caller {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let Some(user_id) = header(USER_HEADER) else {
        return Caller::anonymous();
    };

    let claims: Vec<&str> = header(CLAIMS_HEADER)
        .map(|raw| raw.split(',').map(str::trim).filter(|c| !c.is_empty()).collect())
        .unwrap_or_default();

    Caller::authenticated(user_id, &claims)
}

/// Request correlation id.
///
/// Taken from request extensions when the middleware is installed, else from
/// the `X-Correlation-ID` header, else freshly generated.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .extensions
            .get::<Uuid>()
            .copied()
            .or_else(|| crate::middleware::correlation_id_from(&parts.headers))
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(id))
    }
}
