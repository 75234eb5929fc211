//! # Issuers
//!
//! Authorization-set administration. Reads are public; changes require the
//! owner's token.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use certreg_core::ActorId;
use certreg_registry::{AuthorizationStatus, MembershipChange};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::CallerIdentity;
use crate::error::{AppError, ErrorBody};
use crate::extractors::parse_path;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IssuerStatus {
    pub actor: String,
    pub authorized: bool,
    pub is_owner: bool,
    pub owner: String,
}

impl From<AuthorizationStatus> for IssuerStatus {
    fn from(s: AuthorizationStatus) -> Self {
        Self {
            actor: s.actor.to_string(),
            authorized: s.authorized,
            is_owner: s.is_owner,
            owner: s.owner.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MembershipResult {
    pub actor: String,
    pub authorized: bool,
    pub changed: bool,
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/v1/issuers/{actor}",
        get(issuer_status).put(grant_issuer).delete(revoke_issuer),
    )
}

/// GET /v1/issuers/{actor}: Is this actor an authorized issuer?
#[utoipa::path(
    get,
    path = "/v1/issuers/{actor}",
    params(("actor" = String, Path, description = "Actor identifier")),
    responses(
        (status = 200, description = "Authorization status", body = IssuerStatus),
        (status = 400, description = "Malformed actor", body = ErrorBody),
    ),
    tag = "issuers"
)]
pub async fn issuer_status(
    State(state): State<AppState>,
    Path(actor): Path<String>,
) -> Result<Json<IssuerStatus>, AppError> {
    let actor: ActorId = parse_path(&actor, "actor")?;
    Ok(Json(state.registry.authorization_status(&actor).into()))
}

/// PUT /v1/issuers/{actor}: Grant issuing rights. Owner only.
#[utoipa::path(
    put,
    path = "/v1/issuers/{actor}",
    params(("actor" = String, Path, description = "Actor identifier")),
    responses(
        (status = 200, description = "Actor is authorized", body = MembershipResult),
        (status = 403, description = "Caller is not the owner", body = ErrorBody),
    ),
    tag = "issuers"
)]
pub async fn grant_issuer(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(actor): Path<String>,
) -> Result<Json<MembershipResult>, AppError> {
    let caller = caller.require_actor()?;
    let actor: ActorId = parse_path(&actor, "actor")?;
    let change = state.registry.grant_authorization(caller, &actor)?;
    Ok(Json(MembershipResult {
        actor: actor.to_string(),
        authorized: true,
        changed: change == MembershipChange::Changed,
    }))
}

/// DELETE /v1/issuers/{actor}: Withdraw issuing rights. Owner only.
#[utoipa::path(
    delete,
    path = "/v1/issuers/{actor}",
    params(("actor" = String, Path, description = "Actor identifier")),
    responses(
        (status = 200, description = "Actor is no longer authorized", body = MembershipResult),
        (status = 403, description = "Caller is not the owner", body = ErrorBody),
        (status = 422, description = "Attempt to remove the owner", body = ErrorBody),
    ),
    tag = "issuers"
)]
pub async fn revoke_issuer(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(actor): Path<String>,
) -> Result<Json<MembershipResult>, AppError> {
    let caller = caller.require_actor()?;
    let actor: ActorId = parse_path(&actor, "actor")?;
    let change = state.registry.revoke_authorization(caller, &actor)?;
    Ok(Json(MembershipResult {
        actor: actor.to_string(),
        authorized: false,
        changed: change == MembershipChange::Changed,
    }))
}
