//! # Authorization Gate
//!
//! Decides who may mutate the ledger. There is one owner, fixed at
//! construction and always authorized, plus a member set that only the
//! owner can change.
//!
//! Membership changes are synchronous and run under a single write lock, so
//! concurrent grants and revokes never lose updates.

use std::collections::BTreeSet;

use certreg_core::ActorId;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Whether a grant or revoke changed the member set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipChange {
    Changed,
    Unchanged,
}

/// Serializable snapshot of the authorization state.
///
/// `members` never contains the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationSet {
    pub owner: ActorId,
    #[serde(default)]
    pub members: BTreeSet<ActorId>,
}

/// Owner-administered set of actors allowed to issue and revoke.
#[derive(Debug)]
pub struct AuthorizationGate {
    owner: ActorId,
    members: RwLock<BTreeSet<ActorId>>,
}

impl AuthorizationGate {
    pub fn new(owner: ActorId) -> Self {
        Self {
            owner,
            members: RwLock::new(BTreeSet::new()),
        }
    }

    /// Seed a gate with an initial member list. The owner is skipped if
    /// listed.
    pub fn with_members(owner: ActorId, members: impl IntoIterator<Item = ActorId>) -> Self {
        let members = members.into_iter().filter(|m| *m != owner).collect();
        Self {
            owner,
            members: RwLock::new(members),
        }
    }

    /// Restore a gate from a snapshot taken with [`AuthorizationGate::snapshot`].
    pub fn from_snapshot(set: AuthorizationSet) -> Self {
        Self::with_members(set.owner, set.members)
    }

    pub fn snapshot(&self) -> AuthorizationSet {
        AuthorizationSet {
            owner: self.owner.clone(),
            members: self.members.read().clone(),
        }
    }

    pub fn owner(&self) -> &ActorId {
        &self.owner
    }

    /// Explicitly granted members, sorted. Excludes the owner.
    pub fn members(&self) -> Vec<ActorId> {
        self.members.read().iter().cloned().collect()
    }

    pub fn is_owner(&self, actor: &ActorId) -> bool {
        *actor == self.owner
    }

    pub fn is_authorized(&self, actor: &ActorId) -> bool {
        self.is_owner(actor) || self.members.read().contains(actor)
    }

    /// Add `actor` to the member set. Only the owner may call this.
    pub fn grant(
        &self,
        caller: &ActorId,
        actor: &ActorId,
    ) -> Result<MembershipChange, RegistryError> {
        self.require_owner(caller, "grant authorization")?;
        if self.is_owner(actor) {
            return Ok(MembershipChange::Unchanged);
        }
        let inserted = self.members.write().insert(actor.clone());
        Ok(if inserted {
            tracing::info!(actor = %actor, "authorization granted");
            MembershipChange::Changed
        } else {
            MembershipChange::Unchanged
        })
    }

    /// Remove `actor` from the member set. Only the owner may call this, and
    /// the owner itself cannot be removed.
    pub fn revoke(
        &self,
        caller: &ActorId,
        actor: &ActorId,
    ) -> Result<MembershipChange, RegistryError> {
        self.require_owner(caller, "revoke authorization")?;
        if self.is_owner(actor) {
            return Err(RegistryError::InvalidArgument(
                "the owner's authorization cannot be revoked".into(),
            ));
        }
        let removed = self.members.write().remove(actor);
        Ok(if removed {
            tracing::info!(actor = %actor, "authorization revoked");
            MembershipChange::Changed
        } else {
            MembershipChange::Unchanged
        })
    }

    fn require_owner(&self, caller: &ActorId, action: &'static str) -> Result<(), RegistryError> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            tracing::warn!(actor = %caller, action, "membership change refused");
            Err(RegistryError::PermissionDenied {
                actor: caller.clone(),
                action,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(s: &str) -> ActorId {
        ActorId::new(s).unwrap()
    }

    #[test]
    fn owner_is_always_authorized() {
        let gate = AuthorizationGate::new(actor("owner"));
        assert!(gate.is_authorized(&actor("OWNER")));
        assert!(!gate.is_authorized(&actor("alice")));
        assert!(gate.members().is_empty());
    }

    #[test]
    fn owner_grants_and_revokes() {
        let gate = AuthorizationGate::new(actor("owner"));
        let owner = actor("owner");
        let alice = actor("alice");

        assert_eq!(gate.grant(&owner, &alice).unwrap(), MembershipChange::Changed);
        assert!(gate.is_authorized(&alice));
        assert_eq!(gate.grant(&owner, &alice).unwrap(), MembershipChange::Unchanged);

        assert_eq!(gate.revoke(&owner, &alice).unwrap(), MembershipChange::Changed);
        assert!(!gate.is_authorized(&alice));
        assert_eq!(gate.revoke(&owner, &alice).unwrap(), MembershipChange::Unchanged);
    }

    #[test]
    fn non_owner_cannot_change_membership() {
        let gate = AuthorizationGate::with_members(actor("owner"), [actor("alice")]);
        let alice = actor("alice");
        let bob = actor("bob");

        assert!(matches!(
            gate.grant(&alice, &bob),
            Err(RegistryError::PermissionDenied { .. })
        ));
        assert!(matches!(
            gate.revoke(&alice, &alice),
            Err(RegistryError::PermissionDenied { .. })
        ));
        assert!(!gate.is_authorized(&bob));
        assert!(gate.is_authorized(&alice));
    }

    #[test]
    fn owner_cannot_be_removed() {
        let gate = AuthorizationGate::new(actor("owner"));
        let owner = actor("owner");
        assert!(matches!(
            gate.revoke(&owner, &owner),
            Err(RegistryError::InvalidArgument(_))
        ));
        assert!(gate.is_authorized(&owner));
    }

    #[test]
    fn granting_owner_is_a_no_op() {
        let gate = AuthorizationGate::new(actor("owner"));
        let owner = actor("owner");
        assert_eq!(gate.grant(&owner, &owner).unwrap(), MembershipChange::Unchanged);
        assert!(gate.members().is_empty());
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let gate = AuthorizationGate::with_members(
            actor("owner"),
            [actor("carol"), actor("alice"), actor("owner")],
        );
        let json = serde_json::to_string(&gate.snapshot()).unwrap();
        assert_eq!(json, r#"{"owner":"owner","members":["alice","carol"]}"#);

        let restored = AuthorizationGate::from_snapshot(serde_json::from_str(&json).unwrap());
        assert_eq!(restored.snapshot(), gate.snapshot());
        assert!(restored.is_authorized(&actor("carol")));
    }

    #[test]
    fn concurrent_grants_are_not_lost() {
        let gate = std::sync::Arc::new(AuthorizationGate::new(actor("owner")));
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let gate = std::sync::Arc::clone(&gate);
                std::thread::spawn(move || {
                    let owner = actor("owner");
                    for j in 0..25 {
                        gate.grant(&owner, &actor(&format!("issuer-{i}-{j}"))).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(gate.members().len(), 16 * 25);
    }
}
