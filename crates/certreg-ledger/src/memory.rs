//! In-memory ledger.
//!
//! One `RwLock` guards both the sequence counter and the record map, so id
//! assignment and insertion happen together and status changes are
//! serialized.

use std::collections::HashMap;

use async_trait::async_trait;
use certreg_core::{CertificateId, Timestamp};
use parking_lot::RwLock;

use crate::record::{CertificateRecord, CertificateStatus, NewCertificate, StatusChange};
use crate::{Ledger, LedgerError, DEFAULT_NAMESPACE};

#[derive(Debug)]
struct LedgerState {
    next_sequence: u64,
    records: HashMap<CertificateId, CertificateRecord>,
}

/// Process-local [`Ledger`].
#[derive(Debug)]
pub struct MemoryLedger {
    namespace: String,
    state: RwLock<LedgerState>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl MemoryLedger {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            state: RwLock::new(LedgerState {
                next_sequence: 1,
                records: HashMap::new(),
            }),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Number of records committed.
    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn create(&self, new: NewCertificate) -> Result<CertificateRecord, LedgerError> {
        let mut state = self.state.write();
        let sequence = state.next_sequence;
        let id = CertificateId::derive(&self.namespace, sequence)?;
        if state.records.contains_key(&id) {
            return Err(LedgerError::Conflict(id));
        }
        let record = new.into_record(id, Timestamp::now())?;
        state.next_sequence = sequence
            .checked_add(1)
            .ok_or_else(|| LedgerError::Unavailable("ledger sequence exhausted".into()))?;
        state.records.insert(id, record.clone());
        tracing::debug!(id = %id, sequence, "certificate committed to memory ledger");
        Ok(record)
    }

    async fn get(&self, id: &CertificateId) -> Result<CertificateRecord, LedgerError> {
        self.state
            .read()
            .records
            .get(id)
            .cloned()
            .ok_or(LedgerError::NotFound(*id))
    }

    async fn set_status(
        &self,
        id: &CertificateId,
        status: CertificateStatus,
    ) -> Result<StatusChange, LedgerError> {
        let mut state = self.state.write();
        let record = state
            .records
            .get_mut(id)
            .ok_or(LedgerError::NotFound(*id))?;
        let change = record.status.transition_to(status)?;
        if change == StatusChange::Transitioned {
            record.status = status;
        }
        Ok(change)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certreg_core::{ActorId, ContentRef};

    fn new_cert(subject: &str) -> NewCertificate {
        NewCertificate::new(
            subject,
            "Algorithms 101",
            ContentRef::for_document(subject.as_bytes()),
            ActorId::new("registrar").unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn ids_follow_the_namespace_sequence() {
        let ledger = MemoryLedger::new("campus");
        let a = ledger.create(new_cert("Alice")).await.unwrap();
        let b = ledger.create(new_cert("Bob")).await.unwrap();
        assert_eq!(a.id, CertificateId::derive("campus", 1).unwrap());
        assert_eq!(b.id, CertificateId::derive("campus", 2).unwrap());
        assert_eq!(ledger.len(), 2);
    }

    #[tokio::test]
    async fn default_namespace() {
        let ledger = MemoryLedger::default();
        assert_eq!(ledger.namespace(), DEFAULT_NAMESPACE);
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn failed_transition_leaves_record_untouched() {
        let ledger = MemoryLedger::default();
        let rec = ledger.create(new_cert("Alice")).await.unwrap();
        ledger.set_status(&rec.id, CertificateStatus::Revoked).await.unwrap();
        assert!(ledger.set_status(&rec.id, CertificateStatus::Valid).await.is_err());
        assert_eq!(ledger.get(&rec.id).await.unwrap().status, CertificateStatus::Revoked);
    }
}
