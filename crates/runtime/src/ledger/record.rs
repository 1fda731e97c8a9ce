//! Per-capability grant bookkeeping.
use grasp_core::{CapabilityKey, GrantHandle, TargetId, TargetRef};
use serde::{Deserialize, Serialize};

/// One granted capability and the targets keeping it alive.
///
/// Claimants and locks are weak; they are pruned lazily during
/// reconciliation rather than tracked eagerly.
#[derive(Debug, Clone)]
pub struct GrantRecord {
    key: CapabilityKey,
    handle: GrantHandle,
    persistent: bool,
    manual_clear: bool,
    claimants: Vec<TargetRef>,
    locks: Vec<TargetRef>,
}

impl GrantRecord {
    /// A grant justified by a scanned target.
    pub(crate) fn claimed(
        key: CapabilityKey,
        handle: GrantHandle,
        claimant: TargetRef,
        manual_clear: bool,
    ) -> Self {
        Self {
            key,
            handle,
            persistent: false,
            manual_clear,
            claimants: vec![claimant],
            locks: Vec::new(),
        }
    }

    /// A grant made at initialisation that scans never touch.
    pub(crate) fn persistent(key: CapabilityKey, handle: GrantHandle) -> Self {
        Self {
            key,
            handle,
            persistent: true,
            manual_clear: false,
            claimants: Vec::new(),
            locks: Vec::new(),
        }
    }

    pub fn key(&self) -> &CapabilityKey {
        &self.key
    }

    pub fn handle(&self) -> GrantHandle {
        self.handle
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn is_manual_clear(&self) -> bool {
        self.manual_clear
    }

    pub fn is_locked(&self) -> bool {
        !self.locks.is_empty()
    }

    pub fn claimants(&self) -> impl Iterator<Item = &TargetRef> + '_ {
        self.claimants.iter()
    }

    pub fn claimant_count(&self) -> usize {
        self.claimants.len()
    }

    pub fn has_claimant(&self, id: TargetId) -> bool {
        self.claimants.iter().any(|c| c.id() == id)
    }

    pub fn locks(&self) -> impl Iterator<Item = &TargetRef> + '_ {
        self.locks.iter()
    }

    pub(crate) fn make_persistent(&mut self) {
        self.persistent = true;
        self.claimants.clear();
    }

    /// Returns false if `claimant` was already present.
    pub(crate) fn add_claimant(&mut self, claimant: &TargetRef) -> bool {
        if self.has_claimant(claimant.id()) {
            return false;
        }
        self.claimants.push(claimant.clone());
        true
    }

    pub(crate) fn remove_claimant(&mut self, id: TargetId) -> bool {
        let before = self.claimants.len();
        self.claimants.retain(|c| c.id() != id);
        self.claimants.len() != before
    }

    /// Keeps only claimants for which `keep` holds; returns the dropped ids.
    pub(crate) fn retain_claimants(&mut self, mut keep: impl FnMut(&TargetRef) -> bool) -> Vec<TargetId> {
        let mut dropped = Vec::new();
        self.claimants.retain(|c| {
            let kept = keep(c);
            if !kept {
                dropped.push(c.id());
            }
            kept
        });
        dropped
    }

    pub(crate) fn add_lock(&mut self, target: &TargetRef) -> bool {
        if self.locks.iter().any(|l| l == target) {
            return false;
        }
        self.locks.push(target.clone());
        true
    }

    pub(crate) fn remove_lock(&mut self, id: TargetId) -> bool {
        let before = self.locks.len();
        self.locks.retain(|l| l.id() != id);
        self.locks.len() != before
    }

    /// Drops locks whose target no longer exists and claimants that are gone
    /// or dead.
    pub(crate) fn prune_invalid(&mut self) {
        self.locks.retain(|l| l.upgrade().is_some());
        self.claimants.retain(TargetRef::is_alive);
    }

    pub fn snapshot(&self) -> GrantSnapshot {
        GrantSnapshot {
            key: self.key.clone(),
            handle: self.handle,
            persistent: self.persistent,
            manual_clear: self.manual_clear,
            claimants: self.claimants.iter().map(TargetRef::id).collect(),
            locks: self.locks.iter().map(TargetRef::id).collect(),
        }
    }
}

/// Serialisable view of a [`GrantRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantSnapshot {
    pub key: CapabilityKey,
    pub handle: GrantHandle,
    pub persistent: bool,
    pub manual_clear: bool,
    pub claimants: Vec<TargetId>,
    pub locks: Vec<TargetId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use grasp_core::{InteractionParameters, TargetActor, Vec3};

    fn actor(id: u64) -> Arc<TargetActor> {
        Arc::new(TargetActor::new(
            TargetId(id),
            Vec3::ZERO,
            InteractionParameters::default(),
        ))
    }

    #[test]
    fn claimants_are_deduplicated_by_identity() {
        let a = actor(1);
        let mut record = GrantRecord::claimed(
            CapabilityKey::new("ability.open"),
            GrantHandle(5),
            TargetRef::new(&a),
            false,
        );
        assert!(!record.add_claimant(&TargetRef::new(&a)));
        assert_eq!(record.claimant_count(), 1);
    }

    #[test]
    fn pruning_drops_dead_claimants_and_vanished_locks() {
        let a = actor(1);
        let b = actor(2);
        let lock_holder = actor(3);
        let mut record = GrantRecord::claimed(
            CapabilityKey::new("ability.open"),
            GrantHandle(5),
            TargetRef::new(&a),
            false,
        );
        record.add_claimant(&TargetRef::new(&b));
        record.add_lock(&TargetRef::new(&lock_holder));

        a.set_dead(true);
        drop(lock_holder);
        record.prune_invalid();

        assert_eq!(record.snapshot().claimants, vec![TargetId(2)]);
        assert!(!record.is_locked());
    }
}
