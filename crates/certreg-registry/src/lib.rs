//! # certreg-registry: Certificate Registry
//!
//! Authorized parties register immutable certificates that bind a subject, a
//! claim, and a content-addressed document. Anyone can verify a certificate
//! and see whether it is still valid or has been revoked.
//!
//! ## Components
//!
//! | Component | Crate | Role |
//! |---|---|---|
//! | [`AuthorizationGate`] | here | owner plus member set, decides who may mutate |
//! | `ContentStore` | `certreg-store` | holds documents, returns `sha256:` references |
//! | `Ledger` | `certreg-ledger` | assigns ids, holds records, applies revocation |
//! | [`RegistryService`] | here | issue / verify / revoke orchestration |
//!
//! ## Guarantees
//!
//! - A certificate is visible through `verify` only once `issue` has
//!   returned its id.
//! - Status is monotone: `VALID → REVOKED`, never back. Revocation is
//!   idempotent.
//! - Unauthorized issue, revoke and store requests fail before touching
//!   either backend.
//! - The owner is always authorized and cannot be removed.
//! - Identical documents always map to the same content reference.

pub mod auth;
pub mod config;
pub mod deadline;
pub mod error;
pub mod service;

pub use auth::{AuthorizationGate, AuthorizationSet, MembershipChange};
pub use config::{ConfigError, RegistryConfig};
pub use deadline::Deadline;
pub use error::{OperationStage, RegistryError};
pub use service::{AuthorizationStatus, RegistryService};

pub use certreg_core::{ActorId, CertificateId, ContentRef};
pub use certreg_ledger::{CertificateRecord, CertificateStatus, StatusChange};
