use certreg_core::{CertificateId, CoreError};
use thiserror::Error;

use crate::record::CertificateStatus;

/// Errors raised by ledger backends.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The record to create failed field validation.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("certificate {0} not found")]
    NotFound(CertificateId),

    /// A derived identifier is already taken.
    #[error("certificate {0} already exists")]
    Conflict(CertificateId),

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: CertificateStatus,
        to: CertificateStatus,
    },

    /// A stored record no longer matches its fingerprint.
    #[error("integrity violation for certificate {id}: {detail}")]
    Integrity { id: CertificateId, detail: String },

    /// The backing store failed or returned unusable data.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        Self::Unavailable(format!("database error: {e}"))
    }
}
