//! # Registry Service
//!
//! Orchestrates the authorization gate, content store and ledger.
//!
//! ## Issuance
//!
//! Issuance is a two-step saga with a single commit point:
//!
//! ```text
//! validate ─▶ authorize ─▶ ContentStore::put ─▶ Ledger::create ─▶ id
//!    │            │               │                   │
//!    ▼            ▼               ▼                   ▼
//! Validation  PermissionDenied  UpstreamFailure     UpstreamFailure
//!                               (no content)        (content_ref = Some)
//! ```
//!
//! `put` is idempotent and content-addressed, so there is nothing to
//! compensate. A ledger failure after a successful put leaves an orphan
//! document, and a retried issue creates a fresh id.
//!
//! ## Deadlines
//!
//! Every operation takes a [`Deadline`]. Each backend call runs under
//! `tokio::time::timeout_at`, and an already-expired deadline fails before
//! the call is made.

use std::future::Future;
use std::sync::Arc;

use certreg_core::{ActorId, CertificateId, ContentRef};
use certreg_ledger::record::validate_text;
use certreg_ledger::{
    CertificateRecord, CertificateStatus, Ledger, LedgerError, NewCertificate, StatusChange,
    CLAIM_MAX_CHARS, SUBJECT_NAME_MAX_CHARS,
};
use certreg_store::{ContentStore, DocumentMetadata};
use serde::Serialize;

use crate::auth::{AuthorizationGate, MembershipChange};
use crate::config::RegistryConfig;
use crate::deadline::Deadline;
use crate::error::{OperationStage, RegistryError};

const ISSUED_TOTAL: &str = "certreg_certificates_issued_total";
const REVOKED_TOTAL: &str = "certreg_certificates_revoked_total";
const ISSUE_FAILURES_TOTAL: &str = "certreg_issue_failures_total";

/// Answer to an authorization-status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationStatus {
    pub actor: ActorId,
    pub authorized: bool,
    pub is_owner: bool,
    pub owner: ActorId,
}

/// The certificate registry.
#[derive(Debug)]
pub struct RegistryService {
    config: RegistryConfig,
    gate: AuthorizationGate,
    store: Arc<dyn ContentStore>,
    ledger: Arc<dyn Ledger>,
}

impl RegistryService {
    /// Build a registry whose gate is seeded from `config`.
    pub fn new(
        config: RegistryConfig,
        store: Arc<dyn ContentStore>,
        ledger: Arc<dyn Ledger>,
    ) -> Self {
        let gate = AuthorizationGate::with_members(
            config.owner.clone(),
            config.initial_issuers.iter().cloned(),
        );
        Self::with_gate(config, gate, store, ledger)
    }

    /// Build a registry around an existing gate, for example one restored
    /// from a snapshot. The gate's owner takes precedence over `config.owner`.
    pub fn with_gate(
        config: RegistryConfig,
        gate: AuthorizationGate,
        store: Arc<dyn ContentStore>,
        ledger: Arc<dyn Ledger>,
    ) -> Self {
        tracing::info!(
            owner = %gate.owner(),
            members = gate.members().len(),
            store = store.backend_name(),
            ledger = ledger.backend_name(),
            "registry initialized"
        );
        Self {
            config,
            gate,
            store,
            ledger,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn gate(&self) -> &AuthorizationGate {
        &self.gate
    }

    pub fn store_backend(&self) -> &'static str {
        self.store.backend_name()
    }

    pub fn ledger_backend(&self) -> &'static str {
        self.ledger.backend_name()
    }

    /// A deadline `operation_timeout` from now.
    pub fn default_deadline(&self) -> Deadline {
        Deadline::from_now(self.config.operation_timeout)
    }

    // ── Issuance ────────────────────────────────────────────────────

    /// Store `document` and record a certificate pointing at it.
    ///
    /// The id is returned only after the ledger commit succeeds. Before
    /// that, `verify` for the eventual id reports `NotFound`.
    pub async fn issue(
        &self,
        actor: &ActorId,
        subject_name: &str,
        claim: &str,
        document: &[u8],
        deadline: Deadline,
    ) -> Result<CertificateId, RegistryError> {
        let (subject_name, claim) = validate_fields(subject_name, claim)?;
        self.validate_document(document)?;
        self.authorize(actor, "issue certificates")?;

        let metadata = DocumentMetadata::new(subject_name.clone());
        let content_ref = self
            .call(deadline, OperationStage::ContentPut, None, self.store.put(document, &metadata))
            .await
            .and_then(|r| {
                r.map_err(|e| RegistryError::from_store(e, OperationStage::ContentPut, None))
            })
            .map_err(issue_failure)?;
        tracing::debug!(actor = %actor, content_ref = %content_ref, "document stored");

        self.commit(actor, subject_name, claim, content_ref, deadline).await
    }

    /// Record a certificate for content that was uploaded earlier with
    /// [`RegistryService::store_document`].
    pub async fn issue_with_content_ref(
        &self,
        actor: &ActorId,
        subject_name: &str,
        claim: &str,
        content_ref: &ContentRef,
        deadline: Deadline,
    ) -> Result<CertificateId, RegistryError> {
        let (subject_name, claim) = validate_fields(subject_name, claim)?;
        self.authorize(actor, "issue certificates")?;

        let exists = self
            .call(
                deadline,
                OperationStage::ContentExists,
                None,
                self.store.exists(content_ref),
            )
            .await
            .and_then(|r| {
                r.map_err(|e| RegistryError::from_store(e, OperationStage::ContentExists, None))
            })
            .map_err(issue_failure)?;
        if !exists {
            return Err(RegistryError::Validation(format!(
                "content {content_ref} does not exist in the content store"
            )));
        }

        self.commit(actor, subject_name, claim, content_ref.clone(), deadline)
            .await
    }

    /// Upload a document without issuing. Gated like issuance, so an
    /// unauthorized actor cannot write to the content store.
    pub async fn store_document(
        &self,
        actor: &ActorId,
        subject_name: &str,
        document: &[u8],
        deadline: Deadline,
    ) -> Result<ContentRef, RegistryError> {
        let subject_name = text_field("subject_name", subject_name, SUBJECT_NAME_MAX_CHARS)?;
        self.validate_document(document)?;
        self.authorize(actor, "store documents")?;

        let metadata = DocumentMetadata::new(subject_name);
        let content_ref = self
            .call(deadline, OperationStage::ContentPut, None, self.store.put(document, &metadata))
            .await?
            .map_err(|e| RegistryError::from_store(e, OperationStage::ContentPut, None))?;
        tracing::info!(
            actor = %actor,
            content_ref = %content_ref,
            size = document.len(),
            "document stored"
        );
        Ok(content_ref)
    }

    async fn commit(
        &self,
        actor: &ActorId,
        subject_name: String,
        claim: String,
        content_ref: ContentRef,
        deadline: Deadline,
    ) -> Result<CertificateId, RegistryError> {
        let committed = Some(&content_ref);
        let new = NewCertificate::new(&subject_name, &claim, content_ref.clone(), actor.clone())
            .map_err(|e| RegistryError::from_ledger(e, OperationStage::LedgerCreate, committed))?;

        let record = match self
            .call(deadline, OperationStage::LedgerCreate, committed, self.ledger.create(new))
            .await
            .and_then(|r| {
                r.map_err(|e| {
                    RegistryError::from_ledger(e, OperationStage::LedgerCreate, committed)
                })
            })
        {
            Ok(record) => record,
            Err(err) => {
                let err = issue_failure(err);
                tracing::warn!(
                    actor = %actor,
                    content_ref = %content_ref,
                    error = %err,
                    "ledger commit failed; stored document is orphaned"
                );
                return Err(err);
            }
        };

        metrics::counter!(ISSUED_TOTAL).increment(1);
        tracing::info!(
            actor = %actor,
            id = %record.id,
            content_ref = %record.content_ref,
            "certificate issued"
        );
        Ok(record.id)
    }

    // ── Reads ───────────────────────────────────────────────────────

    /// Read a certificate. No authorization required.
    ///
    /// The record's fingerprint is recomputed. A mismatch means the stored
    /// record was altered outside the ledger and is reported as
    /// [`RegistryError::Integrity`].
    pub async fn verify(
        &self,
        id: &CertificateId,
        deadline: Deadline,
    ) -> Result<CertificateRecord, RegistryError> {
        let record = self
            .call(deadline, OperationStage::LedgerGet, None, self.ledger.get(id))
            .await?
            .map_err(|e| RegistryError::from_ledger(e, OperationStage::LedgerGet, None))?;

        if record.id != *id {
            return Err(RegistryError::Integrity(format!(
                "ledger returned certificate {} for {id}",
                record.id
            )));
        }
        if let Err(e) = record.verify_fingerprint() {
            tracing::error!(id = %id, error = %e, "certificate failed fingerprint check");
            return Err(RegistryError::from_ledger(e, OperationStage::LedgerGet, None));
        }
        Ok(record)
    }

    /// Fetch a stored document. No authorization required.
    pub async fn fetch_document(
        &self,
        content_ref: &ContentRef,
        deadline: Deadline,
    ) -> Result<Vec<u8>, RegistryError> {
        self.call(deadline, OperationStage::ContentGet, None, self.store.get(content_ref))
            .await?
            .map_err(|e| RegistryError::from_store(e, OperationStage::ContentGet, None))?
            .ok_or_else(|| RegistryError::NotFound(format!("document {content_ref}")))
    }

    // ── Revocation ──────────────────────────────────────────────────

    /// Revoke a certificate. Any authorized actor may revoke any
    /// certificate, not only its issuer.
    ///
    /// Revoking an already revoked certificate succeeds with
    /// [`StatusChange::Unchanged`].
    pub async fn revoke(
        &self,
        actor: &ActorId,
        id: &CertificateId,
        deadline: Deadline,
    ) -> Result<StatusChange, RegistryError> {
        self.authorize(actor, "revoke certificates")?;

        let change = self
            .call(
                deadline,
                OperationStage::LedgerSetStatus,
                None,
                self.ledger.set_status(id, CertificateStatus::Revoked),
            )
            .await?
            .map_err(|e| RegistryError::from_ledger(e, OperationStage::LedgerSetStatus, None))?;

        match change {
            StatusChange::Transitioned => {
                metrics::counter!(REVOKED_TOTAL).increment(1);
                tracing::info!(actor = %actor, id = %id, "certificate revoked");
            }
            StatusChange::Unchanged => {
                tracing::debug!(actor = %actor, id = %id, "certificate already revoked");
            }
        }
        Ok(change)
    }

    // ── Authorization ───────────────────────────────────────────────

    pub fn grant_authorization(
        &self,
        caller: &ActorId,
        actor: &ActorId,
    ) -> Result<MembershipChange, RegistryError> {
        self.gate.grant(caller, actor)
    }

    pub fn revoke_authorization(
        &self,
        caller: &ActorId,
        actor: &ActorId,
    ) -> Result<MembershipChange, RegistryError> {
        self.gate.revoke(caller, actor)
    }

    pub fn is_authorized(&self, actor: &ActorId) -> bool {
        self.gate.is_authorized(actor)
    }

    pub fn authorization_status(&self, actor: &ActorId) -> AuthorizationStatus {
        AuthorizationStatus {
            actor: actor.clone(),
            authorized: self.gate.is_authorized(actor),
            is_owner: self.gate.is_owner(actor),
            owner: self.gate.owner().clone(),
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn authorize(&self, actor: &ActorId, action: &'static str) -> Result<(), RegistryError> {
        if self.gate.is_authorized(actor) {
            return Ok(());
        }
        tracing::warn!(actor = %actor, action, "unauthorized request refused");
        Err(RegistryError::PermissionDenied {
            actor: actor.clone(),
            action,
        })
    }

    fn validate_document(&self, document: &[u8]) -> Result<(), RegistryError> {
        if document.is_empty() {
            return Err(RegistryError::Validation("document must not be empty".into()));
        }
        if document.len() > self.config.max_document_bytes {
            return Err(RegistryError::Validation(format!(
                "document is {} bytes, limit is {}",
                document.len(),
                self.config.max_document_bytes
            )));
        }
        Ok(())
    }

    /// Await a backend call within `deadline`.
    ///
    /// The outer `Result` carries deadline expiry. The inner one is the
    /// backend's own outcome, left for the caller to map.
    async fn call<T, E>(
        &self,
        deadline: Deadline,
        stage: OperationStage,
        content_ref: Option<&ContentRef>,
        fut: impl Future<Output = Result<T, E>>,
    ) -> Result<Result<T, E>, RegistryError> {
        let expired = || {
            tracing::warn!(stage = %stage, "operation deadline exceeded");
            RegistryError::DeadlineExceeded {
                stage,
                content_ref: content_ref.cloned(),
            }
        };
        if deadline.is_expired() {
            return Err(expired());
        }
        tokio::time::timeout_at(deadline.instant(), fut)
            .await
            .map_err(|_| expired())
    }
}

fn text_field(field: &'static str, value: &str, max_chars: usize) -> Result<String, RegistryError> {
    validate_text(field, value, max_chars).map_err(|e| match e {
        LedgerError::InvalidRecord(msg) => RegistryError::Validation(msg),
        other => RegistryError::Validation(other.to_string()),
    })
}

fn validate_fields(subject_name: &str, claim: &str) -> Result<(String, String), RegistryError> {
    Ok((
        text_field("subject_name", subject_name, SUBJECT_NAME_MAX_CHARS)?,
        text_field("claim", claim, CLAIM_MAX_CHARS)?,
    ))
}

/// Count a failed issuance by the stage it failed at.
fn issue_failure(err: RegistryError) -> RegistryError {
    if let Some(stage) = err.stage() {
        metrics::counter!(ISSUE_FAILURES_TOTAL, "stage" => stage.as_str()).increment(1);
    }
    err
}
