//! Process-local content store.

use std::collections::HashMap;

use async_trait::async_trait;
use certreg_core::ContentRef;
use parking_lot::RwLock;

use crate::{ensure_non_empty, verify_content, ContentStore, DocumentMetadata, StoreError};

#[derive(Debug, Clone)]
struct StoredDocument {
    bytes: Vec<u8>,
    metadata: DocumentMetadata,
}

/// In-memory [`ContentStore`]. Contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    documents: RwLock<HashMap<ContentRef, StoredDocument>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct documents held.
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Metadata recorded by the first `put` of this content.
    pub fn metadata(&self, content_ref: &ContentRef) -> Option<DocumentMetadata> {
        self.documents
            .read()
            .get(content_ref)
            .map(|doc| doc.metadata.clone())
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(
        &self,
        document: &[u8],
        metadata: &DocumentMetadata,
    ) -> Result<ContentRef, StoreError> {
        ensure_non_empty(document)?;
        let content_ref = ContentRef::for_document(document);
        self.documents
            .write()
            .entry(content_ref.clone())
            .or_insert_with(|| StoredDocument {
                bytes: document.to_vec(),
                metadata: metadata.clone(),
            });
        tracing::debug!(
            content_ref = %content_ref,
            size = document.len(),
            "document stored in memory"
        );
        Ok(content_ref)
    }

    async fn exists(&self, content_ref: &ContentRef) -> Result<bool, StoreError> {
        Ok(self.documents.read().contains_key(content_ref))
    }

    async fn get(&self, content_ref: &ContentRef) -> Result<Option<Vec<u8>>, StoreError> {
        let bytes = match self.documents.read().get(content_ref) {
            Some(doc) => doc.bytes.clone(),
            None => return Ok(None),
        };
        verify_content(content_ref, &bytes)?;
        Ok(Some(bytes))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> DocumentMetadata {
        DocumentMetadata::new("Alice")
    }

    #[tokio::test]
    async fn put_then_get_returns_same_bytes() {
        let store = MemoryContentStore::new();
        let r = store.put(b"diploma", &meta()).await.unwrap();
        assert_eq!(r, ContentRef::for_document(b"diploma"));
        assert!(store.exists(&r).await.unwrap());
        assert_eq!(store.get(&r).await.unwrap().as_deref(), Some(&b"diploma"[..]));
    }

    #[tokio::test]
    async fn empty_document_is_rejected_without_mutation() {
        let store = MemoryContentStore::new();
        let err = store.put(b"", &meta()).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidArgument(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn duplicate_put_keeps_one_copy_and_first_metadata() {
        let store = MemoryContentStore::new();
        let a = store.put(b"same", &DocumentMetadata::new("first")).await.unwrap();
        let b = store.put(b"same", &DocumentMetadata::new("second")).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
        assert_eq!(store.metadata(&a).unwrap().subject_name, "first");
    }

    #[tokio::test]
    async fn unknown_reference_is_absent() {
        let store = MemoryContentStore::new();
        let r = ContentRef::for_document(b"never stored");
        assert!(!store.exists(&r).await.unwrap());
        assert!(store.get(&r).await.unwrap().is_none());
    }

    #[test]
    fn backend_name_is_memory() {
        assert_eq!(MemoryContentStore::new().backend_name(), "memory");
    }
}
