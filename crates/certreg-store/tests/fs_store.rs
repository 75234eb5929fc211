//! Filesystem content store against a real temporary directory.

use std::sync::Arc;

use certreg_core::ContentRef;
use certreg_store::{ContentStore, DocumentMetadata, FsContentStore, StoreError};

fn meta(subject: &str) -> DocumentMetadata {
    DocumentMetadata::new(subject)
}

#[tokio::test]
async fn put_writes_blob_and_sidecar() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsContentStore::new(dir.path());

    let r = store.put(b"%PDF-1.7 transcript", &meta("Alice")).await.unwrap();
    assert_eq!(r, ContentRef::for_document(b"%PDF-1.7 transcript"));

    let blob = dir.path().join("documents").join(format!("{}.bin", r.to_hex()));
    let sidecar = dir.path().join("documents").join(format!("{}.meta.json", r.to_hex()));
    assert_eq!(std::fs::read(&blob).unwrap(), b"%PDF-1.7 transcript");

    let meta: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&sidecar).unwrap()).unwrap();
    assert_eq!(meta["subject_name"], "Alice");
    assert_eq!(meta["size"], 19);
    assert_eq!(meta["content_ref"], r.to_string());
}

#[tokio::test]
async fn get_and_exists_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsContentStore::new(dir.path());
    let r = store.put(b"certificate body", &meta("Bob")).await.unwrap();

    assert!(store.exists(&r).await.unwrap());
    assert_eq!(store.get(&r).await.unwrap().unwrap(), b"certificate body");
}

#[tokio::test]
async fn missing_content_is_absent_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsContentStore::new(dir.path());
    let r = ContentRef::for_document(b"never stored");
    assert!(!store.exists(&r).await.unwrap());
    assert!(store.get(&r).await.unwrap().is_none());
}

#[tokio::test]
async fn empty_payload_is_rejected_and_nothing_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsContentStore::new(dir.path());
    let err = store.put(b"", &meta("Alice")).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidArgument(_)));
    assert!(!dir.path().join("documents").exists());
}

#[tokio::test]
async fn corrupted_blob_is_detected_on_read() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsContentStore::new(dir.path());
    let r = store.put(b"original bytes", &meta("Carol")).await.unwrap();

    std::fs::write(store.blob_path(&r), b"tampered bytes").unwrap();

    match store.get(&r).await.unwrap_err() {
        StoreError::Integrity { content_ref, .. } => assert_eq!(content_ref, r),
        other => panic!("expected Integrity, got {other}"),
    }
}

#[tokio::test]
async fn repeated_put_keeps_first_sidecar() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsContentStore::new(dir.path());
    let a = store.put(b"same", &meta("first")).await.unwrap();
    let b = store.put(b"same", &meta("second")).await.unwrap();
    assert_eq!(a, b);

    let sidecar = dir.path().join("documents").join(format!("{}.meta.json", a.to_hex()));
    let meta: serde_json::Value = serde_json::from_slice(&std::fs::read(sidecar).unwrap()).unwrap();
    assert_eq!(meta["subject_name"], "first");
}

#[tokio::test]
async fn concurrent_identical_puts_are_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FsContentStore::new(dir.path()));
    let doc = vec![7u8; 64 * 1024];

    let mut handles = Vec::new();
    for i in 0..16 {
        let store = Arc::clone(&store);
        let doc = doc.clone();
        handles.push(tokio::spawn(async move {
            store.put(&doc, &DocumentMetadata::new(format!("subject-{i}"))).await
        }));
    }
    let mut refs = Vec::new();
    for h in handles {
        refs.push(h.await.unwrap().unwrap());
    }
    assert!(refs.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(store.get(&refs[0]).await.unwrap().unwrap(), doc);

    let bins = std::fs::read_dir(dir.path().join("documents"))
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("bin"))
        .count();
    assert_eq!(bins, 1);
}
