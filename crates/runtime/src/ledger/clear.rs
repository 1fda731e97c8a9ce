//! Manual overrides: forced clears and revoke-locks.
use grasp_core::{CapabilityKey, ClearFlags, TargetId, TargetRef};
use tracing::debug;

use super::GrantLedger;
use crate::events::{GrantEvent, RevokeReason};
use crate::hooks::GrantContext;

impl GrantLedger {
    /// Revokes a scan-driven grant outright.
    ///
    /// Persistent grants are never cleared here. Locked grants need
    /// [`ClearFlags::LOCKED`], and grants still claimed by a scanned target
    /// need [`ClearFlags::IN_RANGE`]. Returns true if the grant was revoked.
    pub fn clear_granted(&mut self, key: &CapabilityKey, flags: ClearFlags) -> bool {
        if !self.clearable(key, flags, false) {
            return false;
        }
        self.revoke_record(key, RevokeReason::Cleared)
    }

    /// Clears every grant `target` claims, plus the one it publishes if it
    /// is still alive. Returns how many grants were revoked.
    pub fn clear_granted_for_target(&mut self, target: &TargetRef, flags: ClearFlags) -> usize {
        let mut keys: Vec<CapabilityKey> = self
            .records
            .values()
            .filter(|r| r.has_claimant(target.id()))
            .map(|r| r.key().clone())
            .collect();
        if let Some(key) = target
            .upgrade()
            .and_then(|t| t.parameters().and_then(|p| p.capability.clone()))
            && !keys.contains(&key)
        {
            keys.push(key);
        }

        keys.iter()
            .filter(|key| self.clear_granted(key, flags))
            .count()
    }

    /// Clears everything `flags` allows, including persistent grants with
    /// [`ClearFlags::PERSISTENT`] and the scan capability with
    /// [`ClearFlags::SCAN`]. Returns how many grants were revoked.
    pub fn clear_all(&mut self, flags: ClearFlags) -> usize {
        let include_persistent = flags.contains(ClearFlags::PERSISTENT);
        let keys: Vec<CapabilityKey> = self.records.keys().cloned().collect();
        let mut cleared = keys
            .iter()
            .filter(|key| {
                self.clearable(key, flags, include_persistent)
                    && self.revoke_record(key, RevokeReason::Cleared)
            })
            .count();

        if flags.contains(ClearFlags::SCAN)
            && let Some((key, handle)) = self.scan_grant.take()
        {
            self.hooks.pre_clear(&GrantContext {
                key: &key,
                handle,
                target: None,
            });
            if let Some(registry) = &self.registry {
                registry.revoke(handle);
            }
            self.events.publish_grant(GrantEvent::Revoked {
                key,
                handle,
                reason: RevokeReason::Cleared,
            });
            cleared += 1;
        }

        debug!(target: "grasp::ledger", cleared, flags = ?flags, "cleared grants");
        cleared
    }

    fn clearable(&mut self, key: &CapabilityKey, flags: ClearFlags, include_persistent: bool) -> bool {
        let in_range = self.is_in_range(key);
        let Some(record) = self.records.get_mut(key) else {
            return false;
        };
        if record.is_persistent() && !include_persistent {
            debug!(target: "grasp::ledger", %key, "refusing to clear persistent grant");
            return false;
        }
        record.prune_invalid();
        if record.is_locked() && !flags.contains(ClearFlags::LOCKED) {
            debug!(target: "grasp::ledger", %key, "refusing to clear locked grant");
            return false;
        }
        if in_range && !flags.contains(ClearFlags::IN_RANGE) {
            debug!(target: "grasp::ledger", %key, "refusing to clear grant still in range");
            return false;
        }
        true
    }

    /// Pins `key` open on behalf of `holder`. Returns false if the key is not
    /// granted or the holder already locks it.
    pub fn add_lock(&mut self, key: &CapabilityKey, holder: &TargetRef) -> bool {
        let Some(record) = self.records.get_mut(key) else {
            return false;
        };
        if !record.add_lock(holder) {
            return false;
        }
        debug!(target: "grasp::ledger", %key, holder = %holder.id(), "lock added");
        self.events.publish_grant(GrantEvent::LockAdded {
            key: key.clone(),
            target: holder.id(),
        });
        true
    }

    /// Releases a lock. The grant itself is reconsidered on the next cycle.
    pub fn remove_lock(&mut self, key: &CapabilityKey, holder: TargetId) -> bool {
        let Some(record) = self.records.get_mut(key) else {
            return false;
        };
        if !record.remove_lock(holder) {
            return false;
        }
        debug!(target: "grasp::ledger", %key, %holder, "lock removed");
        self.events.publish_grant(GrantEvent::LockRemoved {
            key: key.clone(),
            target: holder,
        });
        true
    }
}
