//! Caller identity extraction.
//!
//! Authentication itself happens in the upstream gateway, which injects the
//! authenticated user's ID as the `x-user-id` header. This extractor is the
//! platform-side half of that contract: handlers that mutate state take an
//! [`ActorId`] argument and requests without the header are rejected.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use bcp_core::types::DbId;

use crate::error::AppError;

/// Header set by the auth gateway.
const ACTOR_HEADER: &str = "x-user-id";

/// The authenticated caller's user ID.
#[derive(Debug, Clone, Copy)]
pub struct ActorId(pub DbId);

impl<S> FromRequestParts<S> for ActorId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<DbId>().ok())
            .map(ActorId)
            .ok_or_else(|| {
                AppError::Unauthorized(format!("missing or invalid {ACTOR_HEADER} header"))
            })
    }
}
