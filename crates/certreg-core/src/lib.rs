//! # certreg-core: Foundational Types for the Certificate Registry
//!
//! This crate is the leaf of the workspace dependency graph. It defines the
//! primitives every other crate agrees on: how identifiers look, how
//! documents and records are content-addressed, and how time is recorded.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `CertificateId`, `ActorId`, and
//!    `ContentRef` are validated at construction. No bare strings cross a
//!    crate boundary where an identifier is meant.
//!
//! 2. **`CanonicalBytes` for structured digests.** Record fingerprints and
//!    certificate identifiers are computed over RFC 8785 (JCS) bytes, so the
//!    same logical value always hashes the same way.
//!
//! 3. **Opaque documents hash their raw bytes.** A certified document is
//!    never re-serialized. Its content address is SHA-256 over exactly the
//!    bytes that were stored.
//!
//! 4. **UTC-only timestamps.** `Timestamp` is UTC with seconds precision.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `certreg-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_document, ContentDigest, DigestAlgorithm};
pub use error::{CanonicalizationError, CoreError};
pub use identity::{ActorId, CertificateId, ContentRef};
pub use temporal::Timestamp;
