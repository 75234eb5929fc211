//! # HTTP Content Store: Pinning Gateway Client
//!
//! Talks to a remote content-addressed blob service.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | PUT    | `/v1/blobs/{hex}?subject={name}` | store, responds `{"digest": "sha256:…"}` |
//! | HEAD   | `/v1/blobs/{hex}` | existence, 200 or 404 |
//! | GET    | `/v1/blobs/{hex}` | fetch raw bytes, 200 or 404 |
//!
//! The gateway's digest is never trusted on its own. It must equal the digest
//! computed locally, and fetched bytes are re-hashed before they are returned.

use std::time::Duration;

use async_trait::async_trait;
use certreg_core::{ContentDigest, ContentRef};
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::config::HttpStoreConfig;
use crate::{ensure_non_empty, verify_content, ContentStore, DocumentMetadata, StoreError};

const API_PREFIX: &str = "v1/blobs";

#[derive(Debug, Deserialize)]
struct PutResponse {
    digest: ContentDigest,
}

/// [`ContentStore`] backed by a remote blob gateway.
#[derive(Debug, Clone)]
pub struct HttpContentStore {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpContentStore {
    /// Build a client from configuration.
    pub fn new(config: HttpStoreConfig) -> Result<Self, StoreError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &config.api_token {
            let value = reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| {
                    StoreError::InvalidArgument("store token is not a valid header value".into())
                })?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| StoreError::Unavailable(format!("client init failed: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url,
        })
    }

    fn blob_url(&self, content_ref: &ContentRef) -> Result<Url, StoreError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/{API_PREFIX}/{}", content_ref.to_hex()))
            .map_err(|e| StoreError::InvalidArgument(format!("cannot build blob URL: {e}")))
    }
}

fn transport_error(endpoint: &str, e: reqwest::Error) -> StoreError {
    StoreError::Unavailable(format!("{endpoint}: {e}"))
}

async fn status_error(endpoint: &str, resp: reqwest::Response) -> StoreError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    StoreError::Unavailable(format!("{endpoint}: gateway returned {status}: {body}"))
}

#[async_trait]
impl ContentStore for HttpContentStore {
    async fn put(
        &self,
        document: &[u8],
        metadata: &DocumentMetadata,
    ) -> Result<ContentRef, StoreError> {
        ensure_non_empty(document)?;
        let content_ref = ContentRef::for_document(document);
        let endpoint = format!("PUT /{API_PREFIX}/{}", content_ref.to_hex());
        let mut url = self.blob_url(&content_ref)?;
        url.query_pairs_mut()
            .append_pair("subject", &metadata.subject_name);

        let resp = self
            .http
            .put(url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(document.to_vec())
            .send()
            .await
            .map_err(|e| transport_error(&endpoint, e))?;

        if !resp.status().is_success() {
            return Err(status_error(&endpoint, resp).await);
        }

        let body: PutResponse = resp
            .json()
            .await
            .map_err(|e| StoreError::Unavailable(format!("{endpoint}: malformed response: {e}")))?;
        if body.digest != *content_ref.digest() {
            tracing::warn!(
                content_ref = %content_ref,
                remote = %body.digest,
                "gateway reported a different digest"
            );
            return Err(StoreError::Integrity {
                content_ref,
                detail: format!("gateway reported digest {}", body.digest),
            });
        }
        tracing::debug!(content_ref = %content_ref, size = document.len(), "document pinned");
        Ok(content_ref)
    }

    async fn exists(&self, content_ref: &ContentRef) -> Result<bool, StoreError> {
        let endpoint = format!("HEAD /{API_PREFIX}/{}", content_ref.to_hex());
        let resp = self
            .http
            .head(self.blob_url(content_ref)?)
            .send()
            .await
            .map_err(|e| transport_error(&endpoint, e))?;
        match resp.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(status_error(&endpoint, resp).await),
        }
    }

    async fn get(&self, content_ref: &ContentRef) -> Result<Option<Vec<u8>>, StoreError> {
        let endpoint = format!("GET /{API_PREFIX}/{}", content_ref.to_hex());
        let resp = self
            .http
            .get(self.blob_url(content_ref)?)
            .send()
            .await
            .map_err(|e| transport_error(&endpoint, e))?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(status_error(&endpoint, resp).await);
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| transport_error(&endpoint, e))?;
        verify_content(content_ref, &bytes)?;
        Ok(Some(bytes.to_vec()))
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}
