//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps [`RegistryError`] to HTTP status codes and a JSON body of the form
//! `{"error":{"code","message","details"?}}`.
//!
//! Backend failure reasons and integrity details are logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use certreg_registry::{OperationStage, RegistryError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Retry context for upstream, timeout and issuance conflict failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body or path could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing or unknown bearer token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is not in the authorization set (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Conflict with current resource state (409).
    #[error("conflict: {message}")]
    Conflict {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// A storage or ledger backend failed (502).
    #[error("upstream failure: {message}")]
    Upstream {
        message: String,
        details: serde_json::Value,
    },

    /// The per-request deadline elapsed (504).
    #[error("deadline exceeded: {message}")]
    Timeout {
        message: String,
        details: serde_json::Value,
    },

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict { .. } => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Upstream { .. } => (StatusCode::BAD_GATEWAY, "UPSTREAM_FAILURE"),
            Self::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "DEADLINE_EXCEEDED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if let Self::Internal(detail) = &self {
            tracing::error!(error = %detail, "internal server error");
        }

        let (message, details) = match self {
            Self::Internal(_) => ("An internal error occurred".to_string(), None),
            Self::Upstream { message, details } | Self::Timeout { message, details } => {
                (message, Some(details))
            }
            Self::Conflict { message, details } => (format!("conflict: {message}"), details),
            other => (other.to_string(), None),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Validation(msg) | RegistryError::InvalidArgument(msg) => {
                Self::Validation(msg)
            }
            err @ RegistryError::PermissionDenied { .. } => Self::Forbidden(err.to_string()),
            RegistryError::NotFound(what) => Self::NotFound(what),
            RegistryError::Conflict { what, content_ref } => Self::Conflict {
                details: content_ref
                    .as_ref()
                    .map(|r| retry_details(OperationStage::LedgerCreate.as_str(), Some(r))),
                message: what,
            },
            RegistryError::Integrity(detail) => {
                Self::Internal(format!("integrity violation: {detail}"))
            }
            RegistryError::UpstreamFailure {
                stage,
                content_ref,
                reason,
            } => {
                tracing::error!(stage = %stage, reason = %reason, "backend call failed");
                Self::Upstream {
                    message: format!("backend unavailable at {stage}"),
                    details: retry_details(stage.as_str(), content_ref.as_ref()),
                }
            }
            RegistryError::DeadlineExceeded { stage, content_ref } => Self::Timeout {
                message: format!("deadline elapsed at {stage}"),
                details: retry_details(stage.as_str(), content_ref.as_ref()),
            },
        }
    }
}

fn retry_details(stage: &str, content_ref: Option<&certreg_core::ContentRef>) -> serde_json::Value {
    serde_json::json!({
        "stage": stage,
        "committed_content_ref": content_ref.map(|r| r.to_string()),
    })
}
