//! # certreg-ledger: Authoritative Certificate Ledger
//!
//! The ledger is the single source of truth for certificate records. It
//! assigns identifiers, persists records with `status = VALID`, and applies
//! the one permitted status change (`VALID → REVOKED`) as an atomic
//! compare-and-set.
//!
//! ## Identifier derivation
//!
//! Each backend owns a monotonic sequence starting at 1. The `n`-th record of
//! namespace `N` gets `CertificateId::derive(N, n)`. Backends still check for
//! an existing id on insert and report [`LedgerError::Conflict`] if one is
//! found.
//!
//! ## Backends
//!
//! - [`MemoryLedger`]: process-local, for tests and development.
//! - `PgLedger` (feature `postgres`): a `certificates` table with a Postgres
//!   sequence and single-statement revocation.

pub mod error;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod record;

pub use error::LedgerError;
pub use memory::MemoryLedger;
#[cfg(feature = "postgres")]
pub use postgres::PgLedger;
pub use record::{
    CertificateRecord, CertificateStatus, NewCertificate, StatusChange, CLAIM_MAX_CHARS,
    SUBJECT_NAME_MAX_CHARS,
};

use std::fmt::Debug;

use async_trait::async_trait;
use certreg_core::CertificateId;

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "certreg";

/// Append-only store of certificate records.
///
/// All operations are linearizable per id.
#[async_trait]
pub trait Ledger: Send + Sync + Debug {
    /// Assign an id and persist `new` with status `Valid`.
    async fn create(&self, new: NewCertificate) -> Result<CertificateRecord, LedgerError>;

    /// Read a record. Fails with [`LedgerError::NotFound`] if absent.
    async fn get(&self, id: &CertificateId) -> Result<CertificateRecord, LedgerError>;

    /// Atomically move a record to `status`.
    ///
    /// Concurrent calls for one id observe exactly one `Transitioned`. The
    /// rest see `Unchanged`.
    async fn set_status(
        &self,
        id: &CertificateId,
        status: CertificateStatus,
    ) -> Result<StatusChange, LedgerError>;

    fn backend_name(&self) -> &'static str;
}
