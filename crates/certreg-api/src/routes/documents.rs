//! # Documents
//!
//! Upload without issuing, and public download by content reference.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use certreg_core::ContentRef;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::CallerIdentity;
use crate::error::{AppError, ErrorBody};
use crate::extractors::{decode_document, extract_json, parse_path};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct StoreDocumentRequest {
    pub subject_name: String,
    /// Document bytes, base64 (standard alphabet).
    pub document: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StoredDocument {
    pub content_ref: String,
    pub size: usize,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/documents", post(store_document))
        .route("/v1/documents/{content_ref}", get(fetch_document))
}

/// POST /v1/documents: Store a document for later issuance.
#[utoipa::path(
    post,
    path = "/v1/documents",
    request_body = StoreDocumentRequest,
    responses(
        (status = 201, description = "Document stored", body = StoredDocument),
        (status = 403, description = "Caller is not an authorized issuer", body = ErrorBody),
        (status = 422, description = "Empty or oversized document", body = ErrorBody),
    ),
    tag = "documents"
)]
pub async fn store_document(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Result<Json<StoreDocumentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<StoredDocument>), AppError> {
    let actor = caller.require_actor()?;
    let req = extract_json(body)?;
    let document = decode_document(&req.document)?;

    let content_ref = state
        .registry
        .store_document(
            actor,
            &req.subject_name,
            &document,
            state.registry.default_deadline(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(StoredDocument {
            content_ref: content_ref.to_string(),
            size: document.len(),
        }),
    ))
}

/// GET /v1/documents/{content_ref}: Download raw document bytes.
#[utoipa::path(
    get,
    path = "/v1/documents/{content_ref}",
    params(("content_ref" = String, Path, description = "sha256:<hex>")),
    responses(
        (status = 200, description = "Document bytes as application/octet-stream"),
        (status = 404, description = "Not found", body = ErrorBody),
    ),
    tag = "documents"
)]
pub async fn fetch_document(
    State(state): State<AppState>,
    Path(content_ref): Path<String>,
) -> Result<Response, AppError> {
    let content_ref: ContentRef = parse_path(&content_ref, "content reference")?;
    let bytes = state
        .registry
        .fetch_document(&content_ref, state.registry.default_deadline())
        .await?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes).into_response())
}
