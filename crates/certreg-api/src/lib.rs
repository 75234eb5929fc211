//! # certreg-api: HTTP Service for the Certificate Registry
//!
//! A thin transport over [`certreg_registry::RegistryService`]. Handlers
//! parse requests, resolve the caller from the bearer token, call one
//! registry operation and map its result. No registry rule lives here.
//!
//! ## API Surface
//!
//! | Route | Module | Auth |
//! |---|---|---|
//! | `/v1/certificates*` | [`routes::certificates`] | bearer for writes |
//! | `/v1/documents*` | [`routes::documents`] | bearer for writes |
//! | `/v1/issuers/{actor}` | [`routes::issuers`] | owner for writes |
//! | `/health/*`, `/metrics` | here | none |
//! | `/openapi.json` | [`openapi`] | none |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! Cors → TraceLayer → BodyLimit → Metrics → Auth → Handler
//! ```
//!
//! CORS wraps the whole router so preflight requests are answered before
//! auth runs. It is only installed when `CERTREG_CORS_ORIGINS` is set.

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::config::CorsOrigins;
use crate::state::AppState;

/// Headroom over the document limit for base64 expansion and JSON fields.
const BODY_OVERHEAD_BYTES: usize = 64 * 1024;

/// Assemble the full application router.
///
/// Health probes and `/metrics` are mounted outside the auth middleware.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig::new(state.config.tokens.clone());
    let cors = cors_layer(&state.config.cors_origins);
    let body_limit = request_body_limit(state.registry.config().max_document_bytes);

    let api = Router::new()
        .merge(routes::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .with_state(state.clone());

    let ops = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(middleware::metrics::render))
        .with_state(state);

    let router = Router::new().merge(ops).merge(api);
    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// Methods and headers the browser client needs. Credentials are only
/// allowed for an explicit origin list.
fn cors_layer(origins: &CorsOrigins) -> Option<CorsLayer> {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    match origins {
        CorsOrigins::Disabled => None,
        CorsOrigins::Any => Some(base.allow_origin(Any)),
        CorsOrigins::List(list) => Some(
            base.allow_origin(AllowOrigin::list(list.iter().cloned()))
                .allow_credentials(true),
        ),
    }
}

/// Base64 inflates by 4/3.
fn request_body_limit(max_document_bytes: usize) -> usize {
    max_document_bytes
        .saturating_add(2)
        .saturating_div(3)
        .saturating_mul(4)
        .saturating_add(BODY_OVERHEAD_BYTES)
}

async fn liveness() -> &'static str {
    "ok"
}

async fn readiness() -> &'static str {
    "ready"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_limit_covers_base64_document() {
        let limit = request_body_limit(3 * 1024);
        assert_eq!(limit, 4 * 1024 + BODY_OVERHEAD_BYTES);
        assert!(request_body_limit(usize::MAX) > 0);
    }

    #[test]
    fn cors_layer_only_when_configured() {
        assert!(cors_layer(&CorsOrigins::Disabled).is_none());
        assert!(cors_layer(&CorsOrigins::Any).is_some());
        assert!(cors_layer(&CorsOrigins::List(vec![header::HeaderValue::from_static(
            "http://localhost:3000"
        )]))
        .is_some());
    }
}
