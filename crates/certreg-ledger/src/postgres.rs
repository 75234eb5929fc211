//! # Postgres Ledger
//!
//! Persists records in the `certificates` table (see `migrations/`). The
//! sequence comes from the `certificate_sequence` Postgres sequence, so ids
//! stay unique across any number of API replicas sharing one database.
//!
//! Revocation is a single conditional `UPDATE`:
//!
//! ```sql
//! UPDATE certificates SET status = 'REVOKED', revoked_at = now()
//!  WHERE id = $1 AND status = 'VALID'
//! ```
//!
//! Exactly one concurrent caller sees `rows_affected = 1`.

use std::time::Duration;

use async_trait::async_trait;
use certreg_core::{ActorId, CertificateId, ContentDigest, ContentRef, Timestamp};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::record::{CertificateRecord, CertificateStatus, NewCertificate, StatusChange};
use crate::{Ledger, LedgerError};

/// Postgres-backed [`Ledger`].
#[derive(Debug, Clone)]
pub struct PgLedger {
    pool: PgPool,
    namespace: String,
}

impl PgLedger {
    /// Wrap an existing pool. Call [`PgLedger::migrate`] before first use.
    pub fn new(pool: PgPool, namespace: impl Into<String>) -> Self {
        Self {
            pool,
            namespace: namespace.into(),
        }
    }

    /// Connect to `database_url` and apply embedded migrations.
    pub async fn connect(
        database_url: &str,
        namespace: impl Into<String>,
    ) -> Result<Self, LedgerError> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;
        tracing::info!("connected to PostgreSQL");

        let ledger = Self::new(pool, namespace);
        ledger.migrate().await?;
        Ok(ledger)
    }

    pub async fn migrate(&self) -> Result<(), LedgerError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| LedgerError::Unavailable(format!("migration failed: {e}")))?;
        tracing::info!("ledger migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn current_status(&self, id: &CertificateId) -> Result<CertificateStatus, LedgerError> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM certificates WHERE id = $1")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;
        status
            .ok_or(LedgerError::NotFound(*id))?
            .parse()
    }
}

#[async_trait]
impl Ledger for PgLedger {
    async fn create(&self, new: NewCertificate) -> Result<CertificateRecord, LedgerError> {
        let mut tx = self.pool.begin().await?;

        let sequence: i64 = sqlx::query_scalar("SELECT nextval('certificate_sequence')")
            .fetch_one(&mut *tx)
            .await?;
        let sequence_u64 = u64::try_from(sequence)
            .map_err(|_| LedgerError::Unavailable(format!("negative ledger sequence {sequence}")))?;
        let id = CertificateId::derive(&self.namespace, sequence_u64)?;
        let record = new.into_record(id, Timestamp::now())?;

        let inserted = sqlx::query(
            "INSERT INTO certificates (id, namespace, sequence, subject_name, claim,
             content_ref, issuer, issued_at, status, fingerprint)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(record.id.to_string())
        .bind(&self.namespace)
        .bind(sequence)
        .bind(&record.subject_name)
        .bind(&record.claim)
        .bind(record.content_ref.to_string())
        .bind(record.issuer.as_str())
        .bind(*record.issued_at.as_datetime())
        .bind(record.status.as_str())
        .bind(record.fingerprint.to_string())
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(LedgerError::Conflict(id));
        }
        tx.commit().await?;

        tracing::debug!(id = %id, sequence, "certificate committed to postgres ledger");
        Ok(record)
    }

    async fn get(&self, id: &CertificateId) -> Result<CertificateRecord, LedgerError> {
        let row = sqlx::query_as::<_, CertificateRow>(
            "SELECT id, subject_name, claim, content_ref, issuer, issued_at, status, fingerprint
             FROM certificates WHERE id = $1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(LedgerError::NotFound(*id))?.into_record()
    }

    async fn set_status(
        &self,
        id: &CertificateId,
        status: CertificateStatus,
    ) -> Result<StatusChange, LedgerError> {
        if status == CertificateStatus::Revoked {
            let result = sqlx::query(
                "UPDATE certificates SET status = 'REVOKED', revoked_at = now()
                 WHERE id = $1 AND status = 'VALID'",
            )
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
            if result.rows_affected() == 1 {
                return Ok(StatusChange::Transitioned);
            }
        }
        // Either the CAS lost or the target is VALID. Report against the
        // status now stored.
        self.current_status(id).await?.transition_to(status).and_then(|change| match change {
            StatusChange::Unchanged => Ok(change),
            StatusChange::Transitioned => Err(LedgerError::Unavailable(format!(
                "status of {id} changed concurrently"
            ))),
        })
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

/// Internal row type for SQLx mapping.
#[derive(Debug, sqlx::FromRow)]
struct CertificateRow {
    id: String,
    subject_name: String,
    claim: String,
    content_ref: String,
    issuer: String,
    issued_at: DateTime<Utc>,
    status: String,
    fingerprint: String,
}

impl CertificateRow {
    fn into_record(self) -> Result<CertificateRecord, LedgerError> {
        let corrupt = |field: &str, e: certreg_core::CoreError| {
            LedgerError::Unavailable(format!("stored {field} is malformed: {e}"))
        };
        Ok(CertificateRecord {
            id: self.id.parse().map_err(|e| corrupt("id", e))?,
            subject_name: self.subject_name,
            claim: self.claim,
            content_ref: self
                .content_ref
                .parse::<ContentRef>()
                .map_err(|e| corrupt("content_ref", e))?,
            issuer: ActorId::new(&self.issuer).map_err(|e| corrupt("issuer", e))?,
            issued_at: Timestamp::from_utc(self.issued_at),
            status: self.status.parse()?,
            fingerprint: self
                .fingerprint
                .parse::<ContentDigest>()
                .map_err(|e| corrupt("fingerprint", e))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> CertificateRecord {
        NewCertificate::new(
            "Alice",
            "Algorithms 101",
            ContentRef::for_document(b"doc"),
            ActorId::new("registrar").unwrap(),
        )
        .unwrap()
        .into_record(
            CertificateId::derive("certreg", 9).unwrap(),
            Timestamp::parse("2026-01-15T12:00:00Z").unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn row_maps_back_to_record() {
        let rec = sample_record();
        let row = CertificateRow {
            id: rec.id.to_string(),
            subject_name: rec.subject_name.clone(),
            claim: rec.claim.clone(),
            content_ref: rec.content_ref.to_string(),
            issuer: rec.issuer.to_string(),
            issued_at: *rec.issued_at.as_datetime(),
            status: "VALID".into(),
            fingerprint: rec.fingerprint.to_string(),
        };
        let back = row.into_record().unwrap();
        assert_eq!(back, rec);
        back.verify_fingerprint().unwrap();
    }

    #[test]
    fn malformed_row_is_reported() {
        let rec = sample_record();
        let row = CertificateRow {
            id: "not-an-id".into(),
            subject_name: rec.subject_name,
            claim: rec.claim,
            content_ref: rec.content_ref.to_string(),
            issuer: rec.issuer.to_string(),
            issued_at: *rec.issued_at.as_datetime(),
            status: "VALID".into(),
            fingerprint: rec.fingerprint.to_string(),
        };
        assert!(matches!(row.into_record(), Err(LedgerError::Unavailable(_))));
    }
}
