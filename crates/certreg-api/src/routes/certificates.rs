//! # Certificates
//!
//! Issuance, public verification and revocation.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use certreg_core::{CertificateId, ContentRef};
use certreg_registry::{CertificateRecord, CertificateStatus, StatusChange};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::CallerIdentity;
use crate::error::{AppError, ErrorBody};
use crate::extractors::{decode_document, extract_json, parse_path};
use crate::state::AppState;

/// Issue a certificate with the document inline.
#[derive(Debug, Deserialize, ToSchema)]
pub struct IssueCertificateRequest {
    pub subject_name: String,
    pub claim: String,
    /// Document bytes, base64 (standard alphabet).
    pub document: String,
}

/// Issue a certificate for a previously stored document.
#[derive(Debug, Deserialize, ToSchema)]
pub struct IssueFromContentRequest {
    pub subject_name: String,
    pub claim: String,
    /// `sha256:<hex>` reference returned by `POST /v1/documents`.
    pub content_ref: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IssuedCertificate {
    pub id: String,
    pub content_ref: String,
}

/// A certificate as returned by verification.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CertificateView {
    pub id: String,
    pub subject_name: String,
    pub claim: String,
    pub content_ref: String,
    pub issuer: String,
    /// RFC 3339, UTC.
    pub issued_at: String,
    /// `VALID` or `REVOKED`.
    pub status: String,
    pub fingerprint: String,
}

impl From<CertificateRecord> for CertificateView {
    fn from(record: CertificateRecord) -> Self {
        Self {
            id: record.id.to_string(),
            subject_name: record.subject_name,
            claim: record.claim,
            content_ref: record.content_ref.to_string(),
            issuer: record.issuer.to_string(),
            issued_at: record.issued_at.to_iso8601(),
            status: record.status.as_str().to_string(),
            fingerprint: record.fingerprint.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RevocationResult {
    pub id: String,
    pub status: String,
    /// False when the certificate was already revoked.
    pub changed: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/certificates", post(issue_certificate))
        .route("/v1/certificates/from-content", post(issue_from_content))
        .route("/v1/certificates/{id}", get(verify_certificate))
        .route("/v1/certificates/{id}/revoke", post(revoke_certificate))
}

/// POST /v1/certificates: Store a document and issue a certificate for it.
#[utoipa::path(
    post,
    path = "/v1/certificates",
    request_body = IssueCertificateRequest,
    responses(
        (status = 201, description = "Certificate issued", body = IssuedCertificate),
        (status = 401, description = "Missing or unknown bearer token", body = ErrorBody),
        (status = 403, description = "Caller is not an authorized issuer", body = ErrorBody),
        (status = 422, description = "Invalid subject, claim or document", body = ErrorBody),
        (status = 502, description = "Backend failure", body = ErrorBody),
        (status = 504, description = "Deadline exceeded", body = ErrorBody),
    ),
    tag = "certificates"
)]
pub async fn issue_certificate(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<IssueCertificateRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<IssuedCertificate>), AppError> {
    let actor = caller.require_actor()?;
    let req = extract_json(body)?;
    let document = decode_document(&req.document)?;

    let id = state
        .registry
        .issue(
            actor,
            &req.subject_name,
            &req.claim,
            &document,
            state.registry.default_deadline(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(IssuedCertificate {
            id: id.to_string(),
            content_ref: ContentRef::for_document(&document).to_string(),
        }),
    ))
}

/// POST /v1/certificates/from-content: Issue against stored content.
#[utoipa::path(
    post,
    path = "/v1/certificates/from-content",
    request_body = IssueFromContentRequest,
    responses(
        (status = 201, description = "Certificate issued", body = IssuedCertificate),
        (status = 403, description = "Caller is not an authorized issuer", body = ErrorBody),
        (status = 422, description = "Unknown content or invalid fields", body = ErrorBody),
    ),
    tag = "certificates"
)]
pub async fn issue_from_content(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<IssueFromContentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<IssuedCertificate>), AppError> {
    let actor = caller.require_actor()?;
    let req = extract_json(body)?;
    let content_ref: ContentRef = req
        .content_ref
        .parse()
        .map_err(|e| AppError::Validation(format!("invalid content_ref: {e}")))?;

    let id = state
        .registry
        .issue_with_content_ref(
            actor,
            &req.subject_name,
            &req.claim,
            &content_ref,
            state.registry.default_deadline(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(IssuedCertificate {
            id: id.to_string(),
            content_ref: content_ref.to_string(),
        }),
    ))
}

/// GET /v1/certificates/{id}: Public verification.
#[utoipa::path(
    get,
    path = "/v1/certificates/{id}",
    params(("id" = String, Path, description = "Certificate id, 0x-prefixed hex")),
    responses(
        (status = 200, description = "Certificate found", body = CertificateView),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody),
    ),
    tag = "certificates"
)]
pub async fn verify_certificate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CertificateView>, AppError> {
    let id: CertificateId = parse_path(&id, "certificate id")?;
    let record = state
        .registry
        .verify(&id, state.registry.default_deadline())
        .await?;
    Ok(Json(record.into()))
}

/// POST /v1/certificates/{id}/revoke: Revoke a certificate. Idempotent.
#[utoipa::path(
    post,
    path = "/v1/certificates/{id}/revoke",
    params(("id" = String, Path, description = "Certificate id, 0x-prefixed hex")),
    responses(
        (status = 200, description = "Certificate is revoked", body = RevocationResult),
        (status = 403, description = "Caller is not an authorized issuer", body = ErrorBody),
        (status = 404, description = "Not found", body = ErrorBody),
    ),
    tag = "certificates"
)]
pub async fn revoke_certificate(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<RevocationResult>, AppError> {
    let actor = caller.require_actor()?;
    let id: CertificateId = parse_path(&id, "certificate id")?;

    let change = state
        .registry
        .revoke(actor, &id, state.registry.default_deadline())
        .await?;

    Ok(Json(RevocationResult {
        id: id.to_string(),
        status: CertificateStatus::Revoked.as_str().to_string(),
        changed: change == StatusChange::Transitioned,
    }))
}
