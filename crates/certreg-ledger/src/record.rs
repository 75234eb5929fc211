//! # Certificate Records and Status Lifecycle
//!
//! ## States
//!
//! ```text
//! NonExistent ──create──▶ Valid ──revoke──▶ Revoked (terminal)
//! ```
//!
//! A record is immutable after creation except for `status`, which moves at
//! most once. Every other field is covered by the record fingerprint, a
//! SHA-256 digest over the JCS bytes of
//! `{id, subject_name, claim, content_ref, issuer, issued_at}`.

use serde::{Deserialize, Serialize};

use certreg_core::{
    sha256_digest, ActorId, CanonicalBytes, CertificateId, ContentDigest, ContentRef, Timestamp,
};

use crate::error::LedgerError;

/// Maximum length of `subject_name`, in characters, after trimming.
pub const SUBJECT_NAME_MAX_CHARS: usize = 256;

/// Maximum length of `claim`, in characters, after trimming.
pub const CLAIM_MAX_CHARS: usize = 512;

// ─── Status ──────────────────────────────────────────────────────────

/// Lifecycle state of an existing certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateStatus {
    /// Issued and not revoked.
    Valid,
    /// Revoked (terminal).
    Revoked,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::Revoked => "REVOKED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Revoked)
    }

    /// Decide what moving from `self` to `target` means.
    ///
    /// Re-applying the current status is a no-op. `Revoked → Valid` is the
    /// only rejected move.
    pub fn transition_to(self, target: Self) -> Result<StatusChange, LedgerError> {
        match (self, target) {
            (Self::Valid, Self::Revoked) => Ok(StatusChange::Transitioned),
            (from, to) if from == to => Ok(StatusChange::Unchanged),
            (from, to) => Err(LedgerError::InvalidTransition { from, to }),
        }
    }
}

impl std::fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CertificateStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VALID" => Ok(Self::Valid),
            "REVOKED" => Ok(Self::Revoked),
            other => Err(LedgerError::Unavailable(format!(
                "unknown certificate status {other:?} in backing store"
            ))),
        }
    }
}

/// Outcome of [`Ledger::set_status`](crate::Ledger::set_status).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusChange {
    /// This call moved the record to the requested status.
    Transitioned,
    /// The record already had the requested status.
    Unchanged,
}

// ─── New records ─────────────────────────────────────────────────────

/// Caller-supplied fields of a record about to be created.
///
/// `id`, `issued_at`, `status` and `fingerprint` are assigned by the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCertificate {
    subject_name: String,
    claim: String,
    content_ref: ContentRef,
    issuer: ActorId,
}

impl NewCertificate {
    /// Validate and trim the free-text fields.
    pub fn new(
        subject_name: &str,
        claim: &str,
        content_ref: ContentRef,
        issuer: ActorId,
    ) -> Result<Self, LedgerError> {
        Ok(Self {
            subject_name: validate_text("subject_name", subject_name, SUBJECT_NAME_MAX_CHARS)?,
            claim: validate_text("claim", claim, CLAIM_MAX_CHARS)?,
            content_ref,
            issuer,
        })
    }

    pub fn subject_name(&self) -> &str {
        &self.subject_name
    }

    pub fn claim(&self) -> &str {
        &self.claim
    }

    pub fn content_ref(&self) -> &ContentRef {
        &self.content_ref
    }

    pub fn issuer(&self) -> &ActorId {
        &self.issuer
    }

    /// Materialize the record the ledger will persist.
    pub fn into_record(
        self,
        id: CertificateId,
        issued_at: Timestamp,
    ) -> Result<CertificateRecord, LedgerError> {
        let fingerprint = compute_fingerprint(
            &id,
            &self.subject_name,
            &self.claim,
            &self.content_ref,
            &self.issuer,
            &issued_at,
        )?;
        Ok(CertificateRecord {
            id,
            subject_name: self.subject_name,
            claim: self.claim,
            content_ref: self.content_ref,
            issuer: self.issuer,
            issued_at,
            status: CertificateStatus::Valid,
            fingerprint,
        })
    }
}

/// Trim `value` and check it is non-empty and at most `max_chars` long.
pub fn validate_text(
    field: &'static str,
    value: &str,
    max_chars: usize,
) -> Result<String, LedgerError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::InvalidRecord(format!("{field} must not be empty")));
    }
    let len = trimmed.chars().count();
    if len > max_chars {
        return Err(LedgerError::InvalidRecord(format!(
            "{field} must be at most {max_chars} characters, got {len}"
        )));
    }
    Ok(trimmed.to_string())
}

// ─── Committed records ───────────────────────────────────────────────

/// A certificate as held by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub id: CertificateId,
    pub subject_name: String,
    pub claim: String,
    pub content_ref: ContentRef,
    pub issuer: ActorId,
    pub issued_at: Timestamp,
    pub status: CertificateStatus,
    /// Digest over the immutable fields, set at creation.
    pub fingerprint: ContentDigest,
}

impl CertificateRecord {
    pub fn is_valid(&self) -> bool {
        self.status == CertificateStatus::Valid
    }

    /// Recompute the fingerprint from the current field values.
    pub fn recompute_fingerprint(&self) -> Result<ContentDigest, LedgerError> {
        compute_fingerprint(
            &self.id,
            &self.subject_name,
            &self.claim,
            &self.content_ref,
            &self.issuer,
            &self.issued_at,
        )
    }

    /// Fail with [`LedgerError::Integrity`] if any immutable field changed
    /// since creation.
    pub fn verify_fingerprint(&self) -> Result<(), LedgerError> {
        let actual = self.recompute_fingerprint()?;
        if actual != self.fingerprint {
            return Err(LedgerError::Integrity {
                id: self.id,
                detail: format!(
                    "fingerprint {} does not match recorded {}",
                    actual, self.fingerprint
                ),
            });
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct FingerprintFields<'a> {
    id: &'a CertificateId,
    subject_name: &'a str,
    claim: &'a str,
    content_ref: &'a ContentRef,
    issuer: &'a ActorId,
    issued_at: &'a Timestamp,
}

fn compute_fingerprint(
    id: &CertificateId,
    subject_name: &str,
    claim: &str,
    content_ref: &ContentRef,
    issuer: &ActorId,
    issued_at: &Timestamp,
) -> Result<ContentDigest, LedgerError> {
    let canonical = CanonicalBytes::new(&FingerprintFields {
        id,
        subject_name,
        claim,
        content_ref,
        issuer,
        issued_at,
    })
    .map_err(certreg_core::CoreError::from)?;
    Ok(sha256_digest(&canonical))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_cert() -> NewCertificate {
        NewCertificate::new(
            "  Alice Example ",
            "Algorithms 101",
            ContentRef::for_document(b"transcript"),
            ActorId::new("registrar").unwrap(),
        )
        .unwrap()
    }

    fn record() -> CertificateRecord {
        new_cert()
            .into_record(
                CertificateId::derive("certreg", 1).unwrap(),
                Timestamp::parse("2026-02-01T09:30:00Z").unwrap(),
            )
            .unwrap()
    }

    #[test]
    fn new_certificate_trims_fields() {
        let c = new_cert();
        assert_eq!(c.subject_name(), "Alice Example");
        assert_eq!(c.claim(), "Algorithms 101");
    }

    #[test]
    fn empty_fields_are_rejected() {
        let r = ContentRef::for_document(b"x");
        let a = ActorId::new("a").unwrap();
        assert!(NewCertificate::new("", "claim", r.clone(), a.clone()).is_err());
        assert!(NewCertificate::new("subject", "   ", r, a).is_err());
    }

    #[test]
    fn over_long_fields_are_rejected() {
        let r = ContentRef::for_document(b"x");
        let a = ActorId::new("a").unwrap();
        let long_name = "n".repeat(SUBJECT_NAME_MAX_CHARS + 1);
        let long_claim = "c".repeat(CLAIM_MAX_CHARS + 1);
        assert!(NewCertificate::new(&long_name, "claim", r.clone(), a.clone()).is_err());
        assert!(NewCertificate::new("subject", &long_claim, r.clone(), a.clone()).is_err());
        assert!(NewCertificate::new(&"n".repeat(SUBJECT_NAME_MAX_CHARS), "claim", r, a).is_ok());
    }

    #[test]
    fn new_record_starts_valid_with_matching_fingerprint() {
        let rec = record();
        assert_eq!(rec.status, CertificateStatus::Valid);
        assert!(rec.is_valid());
        rec.verify_fingerprint().unwrap();
    }

    #[test]
    fn fingerprint_ignores_status() {
        let mut rec = record();
        rec.status = CertificateStatus::Revoked;
        rec.verify_fingerprint().unwrap();
    }

    #[test]
    fn tampering_breaks_fingerprint() {
        let mut rec = record();
        rec.claim = "Advanced Algorithms".into();
        assert!(matches!(
            rec.verify_fingerprint().unwrap_err(),
            LedgerError::Integrity { .. }
        ));

        let mut rec = record();
        rec.issuer = ActorId::new("impostor").unwrap();
        assert!(rec.verify_fingerprint().is_err());
    }

    #[test]
    fn status_transitions() {
        use CertificateStatus::*;
        assert_eq!(Valid.transition_to(Revoked).unwrap(), StatusChange::Transitioned);
        assert_eq!(Revoked.transition_to(Revoked).unwrap(), StatusChange::Unchanged);
        assert_eq!(Valid.transition_to(Valid).unwrap(), StatusChange::Unchanged);
        assert!(matches!(
            Revoked.transition_to(Valid).unwrap_err(),
            LedgerError::InvalidTransition { from: Revoked, to: Valid }
        ));
    }

    #[test]
    fn status_string_forms() {
        assert_eq!(CertificateStatus::Valid.to_string(), "VALID");
        assert_eq!("REVOKED".parse::<CertificateStatus>().unwrap(), CertificateStatus::Revoked);
        assert!("EXPIRED".parse::<CertificateStatus>().is_err());
        assert_eq!(serde_json::to_string(&CertificateStatus::Revoked).unwrap(), "\"REVOKED\"");
        assert!(CertificateStatus::Revoked.is_terminal());
        assert!(!CertificateStatus::Valid.is_terminal());
    }

    #[test]
    fn record_serializes_with_string_identifiers() {
        let rec = record();
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["id"], rec.id.to_string());
        assert_eq!(v["issued_at"], "2026-02-01T09:30:00Z");
        assert_eq!(v["status"], "VALID");
        let back: CertificateRecord = serde_json::from_value(v).unwrap();
        assert_eq!(back, rec);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn any_claim_edit_is_detected(
                claim in "[a-zA-Z0-9 ]{1,64}",
                suffix in "[a-zA-Z0-9]{1,8}",
            ) {
                let new = NewCertificate::new(
                    "Subject",
                    &claim,
                    ContentRef::for_document(claim.as_bytes()),
                    ActorId::new("registrar").unwrap(),
                );
                prop_assume!(new.is_ok());
                let mut rec = new
                    .unwrap()
                    .into_record(
                        CertificateId::derive("certreg", 7).unwrap(),
                        Timestamp::from_epoch_secs(1_768_478_400).unwrap(),
                    )
                    .unwrap();
                prop_assert!(rec.verify_fingerprint().is_ok());
                rec.claim.push_str(&suffix);
                prop_assert!(rec.verify_fingerprint().is_err());
            }
        }
    }
}
