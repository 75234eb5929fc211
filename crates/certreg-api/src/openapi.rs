//! # OpenAPI Specification Assembly
//!
//! Collects the utoipa-documented routes into one document served at
//! `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "certreg API",
        version = "0.1.0",
        description = "Certificates bound to content-addressed documents, publicly verifiable.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        crate::routes::certificates::issue_certificate,
        crate::routes::certificates::issue_from_content,
        crate::routes::certificates::verify_certificate,
        crate::routes::certificates::revoke_certificate,
        crate::routes::documents::store_document,
        crate::routes::documents::fetch_document,
        crate::routes::issuers::issuer_status,
        crate::routes::issuers::grant_issuer,
        crate::routes::issuers::revoke_issuer,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::routes::certificates::IssueCertificateRequest,
        crate::routes::certificates::IssueFromContentRequest,
        crate::routes::certificates::IssuedCertificate,
        crate::routes::certificates::CertificateView,
        crate::routes::certificates::RevocationResult,
        crate::routes::documents::StoreDocumentRequest,
        crate::routes::documents::StoredDocument,
        crate::routes::issuers::IssuerStatus,
        crate::routes::issuers::MembershipResult,
    )),
    tags(
        (name = "certificates", description = "Issue, verify and revoke certificates"),
        (name = "documents", description = "Content-addressed document storage"),
        (name = "issuers", description = "Authorized issuer administration"),
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        let paths: Vec<_> = doc.paths.paths.keys().cloned().collect();
        for expected in [
            "/v1/certificates",
            "/v1/certificates/from-content",
            "/v1/certificates/{id}",
            "/v1/certificates/{id}/revoke",
            "/v1/documents",
            "/v1/documents/{content_ref}",
            "/v1/issuers/{actor}",
        ] {
            assert!(paths.iter().any(|p| p == expected), "missing {expected}");
        }
    }
}
