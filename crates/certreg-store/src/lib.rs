//! # certreg-store: Content-Addressed Document Storage
//!
//! A [`ContentStore`] holds the opaque documents that certificates point at.
//! It knows nothing about certificates. Its only job is to hand back a
//! [`ContentRef`] derived from the bytes, so that identical uploads always
//! resolve to the same reference and a relying party can check a fetched
//! document against the reference recorded on the ledger.
//!
//! ## Backends
//!
//! | Backend | Use |
//! |---|---|
//! | [`MemoryContentStore`] | tests and local development |
//! | [`FsContentStore`] | single-node deployments, `{root}/documents/{hex}.bin` |
//! | [`HttpContentStore`] | remote pinning gateway speaking `/v1/blobs/{hex}` |
//!
//! Every backend re-hashes on read and reports [`StoreError::Integrity`] if
//! the bytes no longer match their address.

pub mod config;
pub mod error;
pub mod fs;
pub mod http;
pub mod memory;

pub use config::{ConfigError, HttpStoreConfig};
pub use error::StoreError;
pub use fs::FsContentStore;
pub use http::HttpContentStore;
pub use memory::MemoryContentStore;

use std::fmt::Debug;

use async_trait::async_trait;
use certreg_core::ContentRef;
use serde::{Deserialize, Serialize};

/// Descriptive metadata recorded alongside a document.
///
/// Metadata never contributes to the content address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Holder the document was uploaded for.
    pub subject_name: String,
}

impl DocumentMetadata {
    pub fn new(subject_name: impl Into<String>) -> Self {
        Self {
            subject_name: subject_name.into(),
        }
    }
}

/// Storage backend for certified documents.
///
/// `put` is idempotent: storing the same bytes twice returns the same
/// reference and leaves one copy.
#[async_trait]
pub trait ContentStore: Send + Sync + Debug {
    /// Store `document` and return its content address.
    ///
    /// Fails with [`StoreError::InvalidArgument`] on an empty payload and
    /// [`StoreError::Unavailable`] on transport or provider failure.
    async fn put(
        &self,
        document: &[u8],
        metadata: &DocumentMetadata,
    ) -> Result<ContentRef, StoreError>;

    /// Whether content with this address is currently stored.
    async fn exists(&self, content_ref: &ContentRef) -> Result<bool, StoreError>;

    /// Fetch the document, verifying it against its address.
    async fn get(&self, content_ref: &ContentRef) -> Result<Option<Vec<u8>>, StoreError>;

    /// Short backend identifier for logs and readiness output.
    fn backend_name(&self) -> &'static str;
}

/// Reject empty payloads before any backend is touched.
pub(crate) fn ensure_non_empty(document: &[u8]) -> Result<(), StoreError> {
    if document.is_empty() {
        return Err(StoreError::InvalidArgument("document must not be empty".into()));
    }
    Ok(())
}

/// Recompute the address of `bytes` and compare it to `expected` in
/// constant time.
pub(crate) fn verify_content(expected: &ContentRef, bytes: &[u8]) -> Result<(), StoreError> {
    use subtle::ConstantTimeEq;

    let actual = ContentRef::for_document(bytes);
    let matches: bool = actual
        .digest()
        .as_bytes()
        .ct_eq(expected.digest().as_bytes())
        .into();
    if !matches {
        return Err(StoreError::Integrity {
            content_ref: expected.clone(),
            detail: format!("stored bytes hash to {actual}"),
        });
    }
    Ok(())
}
