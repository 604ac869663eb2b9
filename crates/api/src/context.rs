//! Actor context for a request.
//!
//! Authentication/session management sits upstream of the ledger; by the
//! time a request reaches these routes, identity is already established.
//! The trusted headers are:
//!
//! - `x-actor-id`: actor uuid (required)
//! - `x-actor-role`: role name (defaults to `donor`)
//! - `x-actor-status`: `verified` or `pending` (defaults to `pending`)

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, StatusCode, request::Parts};

use carefund_auth::{Actor, ActorId, Role, VerificationStatus};

/// Resolved actor identity for a request.
///
/// This is immutable and must be present for all ledger routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    actor: Actor,
}

impl ActorContext {
    pub fn new(actor: Actor) -> Self {
        Self { actor }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }
}

fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, &'static str> {
    let id = headers
        .get("x-actor-id")
        .and_then(|v| v.to_str().ok())
        .ok_or("missing x-actor-id header")?;
    let id: ActorId = id.parse().map_err(|_| "x-actor-id is not a valid uuid")?;

    let role = headers
        .get("x-actor-role")
        .and_then(|v| v.to_str().ok())
        .map(|s| Role::new(s.to_string()))
        .unwrap_or_else(Role::donor);

    let status = match headers.get("x-actor-status").and_then(|v| v.to_str().ok()) {
        Some("verified") => VerificationStatus::Verified,
        _ => VerificationStatus::Pending,
    };

    Ok(Actor::new(id, role, status))
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for ActorContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_headers(&parts.headers)
            .map(ActorContext::new)
            .map_err(|msg| (StatusCode::UNAUTHORIZED, msg))
    }
}
