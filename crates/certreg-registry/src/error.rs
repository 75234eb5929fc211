//! # Registry Errors
//!
//! `RegistryError` is the only error type callers of [`RegistryService`]
//! see. Backend errors are mapped at the service boundary together with
//! the [`OperationStage`] they came from.
//!
//! | Variant | Side effects before failure |
//! |---|---|
//! | `Validation`, `PermissionDenied`, `InvalidArgument` | none |
//! | `UpstreamFailure`, `DeadlineExceeded` | content may be committed |
//! | `Conflict` | content committed when raised by issuance |
//! | `NotFound`, `Integrity` | none beyond what the stage itself did |
//!
//! [`RegistryService`]: crate::RegistryService

use certreg_core::{ActorId, ContentRef, CoreError};
use certreg_ledger::LedgerError;
use certreg_store::StoreError;
use serde::Serialize;
use thiserror::Error;

/// Suspension point at which an operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStage {
    ContentPut,
    ContentExists,
    ContentGet,
    LedgerCreate,
    LedgerGet,
    LedgerSetStatus,
}

impl OperationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContentPut => "content_put",
            Self::ContentExists => "content_exists",
            Self::ContentGet => "content_get",
            Self::LedgerCreate => "ledger_create",
            Self::LedgerGet => "ledger_get",
            Self::LedgerSetStatus => "ledger_set_status",
        }
    }
}

impl std::fmt::Display for OperationStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by registry operations.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Input failed a pre-flight check.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The actor is not in the authorization set (or is not the owner, for
    /// membership changes).
    #[error("{actor} is not permitted to {action}")]
    PermissionDenied {
        actor: ActorId,
        action: &'static str,
    },

    /// The request is well-formed but not allowed, for example removing the
    /// owner or un-revoking a certificate.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The ledger already holds the id. Raised by issuance after the
    /// document was stored, so `content_ref` is set in that case.
    #[error("conflict: {what}")]
    Conflict {
        what: String,
        content_ref: Option<ContentRef>,
    },

    /// A record or document no longer matches its digest.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// A backend failed. Safe to retry the whole operation.
    #[error("upstream failure at {stage}: {reason}")]
    UpstreamFailure {
        stage: OperationStage,
        content_ref: Option<ContentRef>,
        reason: String,
    },

    /// The caller's deadline elapsed while waiting on a backend.
    #[error("deadline exceeded at {stage}")]
    DeadlineExceeded {
        stage: OperationStage,
        content_ref: Option<ContentRef>,
    },
}

impl RegistryError {
    /// Content that was durably stored before this failure, if any.
    ///
    /// A retried issuance with the same document will resolve to the same
    /// reference, so callers can treat it as already uploaded.
    pub fn committed_content(&self) -> Option<&ContentRef> {
        match self {
            Self::UpstreamFailure { content_ref, .. }
            | Self::DeadlineExceeded { content_ref, .. }
            | Self::Conflict { content_ref, .. } => content_ref.as_ref(),
            _ => None,
        }
    }

    /// Stage label for failure metrics, if the error came from a backend.
    pub fn stage(&self) -> Option<OperationStage> {
        match self {
            Self::UpstreamFailure { stage, .. } | Self::DeadlineExceeded { stage, .. } => {
                Some(*stage)
            }
            _ => None,
        }
    }

    /// A digest mismatch on `put` is a backend failure. On reads it is
    /// `Integrity`.
    pub(crate) fn from_store(
        e: StoreError,
        stage: OperationStage,
        content_ref: Option<&ContentRef>,
    ) -> Self {
        match e {
            StoreError::InvalidArgument(msg) => Self::Validation(msg),
            other @ StoreError::Integrity { .. } if stage == OperationStage::ContentPut => {
                Self::UpstreamFailure {
                    stage,
                    content_ref: content_ref.cloned(),
                    reason: other.to_string(),
                }
            }
            StoreError::Integrity { content_ref, detail } => {
                Self::Integrity(format!("document {content_ref}: {detail}"))
            }
            other @ (StoreError::Unavailable(_) | StoreError::Io(_)) => Self::UpstreamFailure {
                stage,
                content_ref: content_ref.cloned(),
                reason: other.to_string(),
            },
        }
    }

    pub(crate) fn from_ledger(
        e: LedgerError,
        stage: OperationStage,
        content_ref: Option<&ContentRef>,
    ) -> Self {
        match e {
            LedgerError::InvalidRecord(msg) => Self::Validation(msg),
            LedgerError::NotFound(id) => Self::NotFound(format!("certificate {id}")),
            LedgerError::Conflict(id) => Self::Conflict {
                what: format!("certificate {id} already exists"),
                content_ref: content_ref.cloned(),
            },
            err @ LedgerError::InvalidTransition { .. } => Self::InvalidArgument(err.to_string()),
            err @ LedgerError::Integrity { .. } => Self::Integrity(err.to_string()),
            other @ (LedgerError::Unavailable(_) | LedgerError::Core(_)) => Self::UpstreamFailure {
                stage,
                content_ref: content_ref.cloned(),
                reason: other.to_string(),
            },
        }
    }
}

impl From<CoreError> for RegistryError {
    fn from(e: CoreError) -> Self {
        Self::Validation(e.to_string())
    }
}
