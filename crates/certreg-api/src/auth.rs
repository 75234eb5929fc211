//! # Authentication Middleware
//!
//! Maps `Authorization: Bearer <secret>` to the [`ActorId`] configured for
//! that secret. Authorization itself is decided by the registry's gate;
//! this layer only establishes who is calling.
//!
//! | Header | Outcome |
//! |---|---|
//! | absent | anonymous caller, enough for public reads |
//! | `Bearer <known secret>` | caller is the mapped actor |
//! | `Bearer <unknown secret>` or other scheme | 401 |

use std::sync::Arc;

use axum::extract::{FromRequestParts, Request};
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use certreg_core::ActorId;
use subtle::ConstantTimeEq;

use crate::error::AppError;

/// One configured bearer secret.
#[derive(Clone)]
pub struct ApiToken {
    actor: ActorId,
    secret: String,
}

impl ApiToken {
    pub fn new(actor: ActorId, secret: impl Into<String>) -> Self {
        Self {
            actor,
            secret: secret.into(),
        }
    }

    pub fn actor(&self) -> &ActorId {
        &self.actor
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiToken")
            .field("actor", &self.actor)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Token table injected into request extensions.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    tokens: Arc<Vec<ApiToken>>,
}

impl AuthConfig {
    pub fn new(tokens: Vec<ApiToken>) -> Self {
        Self {
            tokens: Arc::new(tokens),
        }
    }

    /// Find the actor for `provided`.
    ///
    /// Every entry is compared so the time taken does not depend on which
    /// entry matched.
    pub fn authenticate(&self, provided: &str) -> Option<ActorId> {
        let mut found = None;
        for token in self.tokens.iter() {
            if constant_time_token_eq(provided, &token.secret) && found.is_none() {
                found = Some(token.actor.clone());
            }
        }
        found
    }
}

fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Who is calling. `actor` is `None` for anonymous requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub actor: Option<ActorId>,
}

impl CallerIdentity {
    pub fn anonymous() -> Self {
        Self { actor: None }
    }

    /// The authenticated actor, or 401 for anonymous callers.
    pub fn require_actor(&self) -> Result<&ActorId, AppError> {
        self.actor
            .as_ref()
            .ok_or_else(|| AppError::Unauthorized("bearer token required".into()))
    }
}

impl<S: Send + Sync> FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// Resolve the bearer token and inject a [`CallerIdentity`].
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let config = request
        .extensions()
        .get::<AuthConfig>()
        .cloned()
        .unwrap_or_default();

    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .map(|v| v.to_str().unwrap_or_default().to_string());

    let identity = match header_value.as_deref() {
        None => CallerIdentity::anonymous(),
        Some(value) => match value.strip_prefix("Bearer ") {
            Some(provided) => match config.authenticate(provided.trim()) {
                Some(actor) => CallerIdentity { actor: Some(actor) },
                None => {
                    tracing::warn!("authentication failed: unknown bearer token");
                    return AppError::Unauthorized("invalid bearer token".into()).into_response();
                }
            },
            None => {
                tracing::warn!("authentication failed: non-Bearer authorization scheme");
                return AppError::Unauthorized("authorization header must use Bearer scheme".into())
                    .into_response();
            }
        },
    };

    request.extensions_mut().insert(identity);
    next.run(request).await
}
