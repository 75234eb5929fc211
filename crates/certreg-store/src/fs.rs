//! # Filesystem Content Store
//!
//! Documents live at `{root}/documents/{hex}.bin`, where `hex` is the SHA-256
//! of the bytes. A `{hex}.meta.json` sidecar records who the document was
//! uploaded for and when.
//!
//! ## Integrity Invariant
//!
//! The filename encodes the digest. On read the digest is recomputed and
//! compared in constant time, so corruption or tampering on disk surfaces as
//! [`StoreError::Integrity`] instead of a silently wrong document.
//!
//! ## Concurrency
//!
//! Each write goes to a temporary file in the same directory and is then
//! linked into place with no-clobber semantics. Concurrent puts of identical
//! bytes race harmlessly: one wins, the rest observe `AlreadyExists`, and no
//! reader ever sees a partially written blob.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use certreg_core::{ContentRef, Timestamp};
use serde::{Deserialize, Serialize};

use crate::{ensure_non_empty, verify_content, ContentStore, DocumentMetadata, StoreError};

const DOCUMENTS_DIR: &str = "documents";

/// Sidecar written next to every blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocumentSidecar {
    content_ref: ContentRef,
    subject_name: String,
    size: u64,
    stored_at: Timestamp,
}

/// Filesystem-backed [`ContentStore`].
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    /// Create a store rooted at `root`. The directory is created lazily on
    /// the first `put`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the blob for `content_ref`.
    pub fn blob_path(&self, content_ref: &ContentRef) -> PathBuf {
        self.root
            .join(DOCUMENTS_DIR)
            .join(format!("{}.bin", content_ref.to_hex()))
    }

    fn sidecar_path(&self, content_ref: &ContentRef) -> PathBuf {
        self.root
            .join(DOCUMENTS_DIR)
            .join(format!("{}.meta.json", content_ref.to_hex()))
    }

    fn put_blocking(
        &self,
        document: &[u8],
        metadata: &DocumentMetadata,
    ) -> Result<ContentRef, StoreError> {
        let content_ref = ContentRef::for_document(document);
        let dir = self.root.join(DOCUMENTS_DIR);
        std::fs::create_dir_all(&dir)?;

        let created = write_if_absent(&dir, &self.blob_path(&content_ref), document)?;
        if created {
            let sidecar = DocumentSidecar {
                content_ref: content_ref.clone(),
                subject_name: metadata.subject_name.clone(),
                size: document.len() as u64,
                stored_at: Timestamp::now(),
            };
            let json = serde_json::to_vec_pretty(&sidecar).map_err(|e| {
                StoreError::Unavailable(format!("sidecar serialization failed: {e}"))
            })?;
            write_if_absent(&dir, &self.sidecar_path(&content_ref), &json)?;
            tracing::debug!(
                content_ref = %content_ref,
                size = document.len(),
                "document written to disk"
            );
        } else {
            tracing::debug!(content_ref = %content_ref, "document already present on disk");
        }
        Ok(content_ref)
    }

    fn get_blocking(&self, content_ref: &ContentRef) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.blob_path(content_ref);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if let Err(err) = verify_content(content_ref, &bytes) {
            tracing::warn!(
                path = %path.display(),
                content_ref = %content_ref,
                "stored document failed integrity check"
            );
            return Err(err);
        }
        Ok(Some(bytes))
    }
}

/// Write `bytes` to `path` unless a file is already there.
///
/// Returns `true` if this call created the file.
fn write_if_absent(dir: &Path, path: &Path, bytes: &[u8]) -> Result<bool, StoreError> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    match tmp.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.error.into()),
    }
}

/// Run blocking filesystem work off the async executor.
async fn blocking<T, F>(f: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Unavailable(format!("filesystem task failed: {e}")))?
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn put(
        &self,
        document: &[u8],
        metadata: &DocumentMetadata,
    ) -> Result<ContentRef, StoreError> {
        ensure_non_empty(document)?;
        let store = self.clone();
        let document = document.to_vec();
        let metadata = metadata.clone();
        blocking(move || store.put_blocking(&document, &metadata)).await
    }

    async fn exists(&self, content_ref: &ContentRef) -> Result<bool, StoreError> {
        let path = self.blob_path(content_ref);
        blocking(move || Ok(path.try_exists()?)).await
    }

    async fn get(&self, content_ref: &ContentRef) -> Result<Option<Vec<u8>>, StoreError> {
        let store = self.clone();
        let content_ref = content_ref.clone();
        blocking(move || store.get_blocking(&content_ref)).await
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }
}
