//! Capability grant ledger.
//!
//! The ledger owns one [`GrantRecord`] per granted capability and reconciles
//! them against each completed scan cycle. It is driven exclusively from the
//! scan worker task, so it takes `&mut self` and needs no locking.
//!
//! Registry calls are synchronous and never fail loudly: a refused grant is
//! logged and retried on the next cycle, a missing registry turns every
//! operation into a logged no-op.
mod activate;
mod clear;
mod reconcile;
mod record;

pub use reconcile::ReconcileReport;
pub use record::{GrantRecord, GrantSnapshot};

use std::collections::BTreeMap;
use std::sync::Arc;

use grasp_core::{CapabilityKey, GrantHandle, ScanResult, TargetId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::CapabilityRegistry;
use crate::api::ScanError;
use crate::events::{EventBus, GrantEvent, RevokeReason, ScanHit};
use crate::hooks::{GrantContext, HookRegistry};

/// Serialisable view of the whole ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub grants: Vec<GrantSnapshot>,
    pub scan_capability: Option<(CapabilityKey, GrantHandle)>,
    pub results: Vec<ScanHit>,
}

/// Grants, locks and the latest scan results of one agent.
pub struct GrantLedger {
    registry: Option<Arc<dyn CapabilityRegistry>>,
    records: BTreeMap<CapabilityKey, GrantRecord>,
    scan_grant: Option<(CapabilityKey, GrantHandle)>,
    results: Vec<ScanResult>,
    hooks: HookRegistry,
    events: EventBus,
}

impl GrantLedger {
    pub fn new(hooks: HookRegistry, events: EventBus) -> Self {
        Self {
            registry: None,
            records: BTreeMap::new(),
            scan_grant: None,
            results: Vec::new(),
            hooks,
            events,
        }
    }

    /// Attaches the registry grants are made through. Records made against a
    /// previous registry are kept as-is.
    pub fn set_registry(&mut self, registry: Arc<dyn CapabilityRegistry>) {
        self.registry = Some(registry);
    }

    pub fn has_registry(&self) -> bool {
        self.registry.is_some()
    }

    /// Grants the persistent capabilities and the scan capability.
    ///
    /// Re-running is safe: persistent keys already held are skipped, a
    /// scan-driven record for a persistent key is promoted in place, and a
    /// previously granted scan capability is revoked and granted again.
    /// Returns the number of new grants.
    pub fn initialize(
        &mut self,
        persistent: &[CapabilityKey],
        scan_capability: Option<&CapabilityKey>,
    ) -> Result<usize, ScanError> {
        let registry = self.registry.clone().ok_or(ScanError::RegistryUnavailable)?;
        let mut granted = 0;

        if let Some((key, handle)) = self.scan_grant.take() {
            self.hooks.pre_clear(&GrantContext {
                key: &key,
                handle,
                target: None,
            });
            registry.revoke(handle);
            self.events.publish_grant(GrantEvent::Revoked {
                key,
                handle,
                reason: RevokeReason::Reinitialized,
            });
        }

        for key in persistent {
            if let Some(record) = self.records.get_mut(key) {
                if !record.is_persistent() {
                    debug!(target: "grasp::ledger", %key, "promoting scan-driven grant to persistent");
                    record.make_persistent();
                }
                continue;
            }

            let Some(handle) = registry.grant(key).filter(GrantHandle::is_valid) else {
                warn!(target: "grasp::ledger", %key, "registry refused persistent grant");
                continue;
            };
            self.records
                .insert(key.clone(), GrantRecord::persistent(key.clone(), handle));
            self.hooks.post_grant_persistent(&GrantContext {
                key,
                handle,
                target: None,
            });
            self.events.publish_grant(GrantEvent::Granted {
                key: key.clone(),
                handle,
                target: None,
                persistent: true,
            });
            granted += 1;
        }

        if let Some(key) = scan_capability {
            match registry.grant(key).filter(GrantHandle::is_valid) {
                Some(handle) => {
                    self.hooks.post_grant_persistent(&GrantContext {
                        key,
                        handle,
                        target: None,
                    });
                    self.events.publish_grant(GrantEvent::Granted {
                        key: key.clone(),
                        handle,
                        target: None,
                        persistent: true,
                    });
                    self.scan_grant = Some((key.clone(), handle));
                    granted += 1;
                }
                None => warn!(target: "grasp::ledger", %key, "registry refused scan capability"),
            }
        }

        info!(
            target: "grasp::ledger",
            granted,
            persistent = persistent.len(),
            scan = scan_capability.is_some(),
            "ledger initialised"
        );
        Ok(granted)
    }

    pub fn record(&self, key: &CapabilityKey) -> Option<&GrantRecord> {
        self.records.get(key)
    }

    pub fn records(&self) -> impl Iterator<Item = &GrantRecord> + '_ {
        self.records.values()
    }

    pub fn is_granted(&self, key: &CapabilityKey) -> bool {
        self.records.contains_key(key)
    }

    pub fn scan_capability(&self) -> Option<&(CapabilityKey, GrantHandle)> {
        self.scan_grant.as_ref()
    }

    /// The results handed over by the last reconciliation.
    pub fn results(&self) -> &[ScanResult] {
        &self.results
    }

    /// True if some live claimant of `key` is in the latest scan results.
    pub fn is_in_range(&self, key: &CapabilityKey) -> bool {
        let Some(record) = self.records.get(key) else {
            return false;
        };
        record
            .claimants()
            .any(|claimant| claimant.is_alive() && self.is_target_in_range(claimant.id()))
    }

    /// True if `target` appears in the latest scan results.
    pub fn is_target_in_range(&self, target: TargetId) -> bool {
        self.results.iter().any(|r| r.target.id() == target)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            grants: self.records.values().map(GrantRecord::snapshot).collect(),
            scan_capability: self.scan_grant.clone(),
            results: self.results.iter().map(ScanHit::from).collect(),
        }
    }

    /// Removes a record, notifying hooks first and the registry after.
    fn revoke_record(&mut self, key: &CapabilityKey, reason: RevokeReason) -> bool {
        let Some(record) = self.records.remove(key) else {
            return false;
        };
        let handle = record.handle();
        self.hooks.pre_clear(&GrantContext {
            key,
            handle,
            target: None,
        });
        match &self.registry {
            Some(registry) => registry.revoke(handle),
            None => warn!(target: "grasp::ledger", %key, %handle, "no registry to revoke from"),
        }
        debug!(target: "grasp::ledger", %key, %handle, %reason, "grant revoked");
        self.events.publish_grant(GrantEvent::Revoked {
            key: key.clone(),
            handle,
            reason,
        });
        true
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use grasp_core::{InteractionParameters, TargetActor, TargetRef, Vec3};

    use crate::memory::InMemoryCapabilityRegistry;

    pub(crate) fn ledger_with(registry: &Arc<InMemoryCapabilityRegistry>) -> GrantLedger {
        let mut ledger = GrantLedger::new(HookRegistry::empty(), EventBus::new());
        ledger.set_registry(registry.clone());
        ledger
    }

    pub(crate) fn door(id: u64, key: &str) -> Arc<TargetActor> {
        Arc::new(TargetActor::new(
            TargetId(id),
            Vec3::ZERO,
            InteractionParameters::default().with_capability(key),
        ))
    }

    #[test]
    fn initialize_requires_a_registry() {
        let mut ledger = GrantLedger::new(HookRegistry::empty(), EventBus::new());
        assert_eq!(
            ledger.initialize(&[CapabilityKey::new("ability.crouch")], None),
            Err(ScanError::RegistryUnavailable)
        );
    }

    #[test]
    fn initialize_is_idempotent_for_persistent_keys() {
        let registry = Arc::new(InMemoryCapabilityRegistry::new());
        let mut ledger = ledger_with(&registry);
        let persistent = [CapabilityKey::new("ability.crouch")];
        let scan = CapabilityKey::new("ability.scan");

        assert_eq!(ledger.initialize(&persistent, Some(&scan)), Ok(2));
        assert_eq!(ledger.initialize(&persistent, Some(&scan)), Ok(1));

        assert!(ledger.record(&persistent[0]).is_some_and(GrantRecord::is_persistent));
        // the first scan grant was replaced, not leaked
        assert_eq!(registry.live_grants(), 2);
    }

    #[test]
    fn range_follows_the_latest_results() {
        let registry = Arc::new(InMemoryCapabilityRegistry::new());
        let mut ledger = ledger_with(&registry);
        let a = door(1, "ability.open");
        let key = CapabilityKey::new("ability.open");
        let hit = ScanResult::new(grasp_core::CategoryKey::interact(), TargetRef::new(&a), 0.2);

        ledger.reconcile(vec![hit]);
        assert!(ledger.is_target_in_range(TargetId(1)));
        assert!(ledger.is_in_range(&key));

        a.set_dead(true);
        assert!(ledger.is_target_in_range(TargetId(1)));
        assert!(!ledger.is_in_range(&key));

        ledger.reconcile(Vec::new());
        assert!(!ledger.is_target_in_range(TargetId(1)));
    }
}
