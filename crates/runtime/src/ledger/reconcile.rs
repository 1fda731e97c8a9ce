//! Reconciliation of grants against a finished scan cycle.
use std::collections::HashSet;

use grasp_core::{CapabilityKey, GrantHandle, ScanResult, TargetId};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::{GrantLedger, GrantRecord};
use crate::events::{GrantEvent, RevokeReason};
use crate::hooks::GrantContext;

/// What one reconciliation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub granted: Vec<CapabilityKey>,
    pub claimed: Vec<(CapabilityKey, TargetId)>,
    pub forfeited: Vec<(CapabilityKey, TargetId)>,
    pub revoked: Vec<CapabilityKey>,
}

impl ReconcileReport {
    /// Nothing was granted, claimed, forfeited or revoked.
    pub fn is_quiet(&self) -> bool {
        self.granted.is_empty()
            && self.claimed.is_empty()
            && self.forfeited.is_empty()
            && self.revoked.is_empty()
    }
}

impl GrantLedger {
    /// Replaces the current scan results and brings grants in line with them.
    ///
    /// Grants run before revocations so a capability shared by an arriving
    /// and a departing target is never revoked and re-granted in one cycle.
    /// Persistent grants, the scan capability and manual-clear grants are
    /// never revoked here; locked grants are kept until their locks go.
    pub fn reconcile(&mut self, results: Vec<ScanResult>) -> ReconcileReport {
        let previous = std::mem::take(&mut self.results);
        let current = results;
        let mut report = ReconcileReport::default();

        self.grant_pass(&current, &mut report);
        let current_ids: HashSet<TargetId> = current.iter().map(|r| r.target.id()).collect();
        self.revoke_pass(&previous, &current_ids, &mut report);
        self.sweep_stale(&current_ids, &mut report);

        self.results = current;
        if !report.is_quiet() {
            debug!(
                target: "grasp::ledger",
                granted = report.granted.len(),
                claimed = report.claimed.len(),
                forfeited = report.forfeited.len(),
                revoked = report.revoked.len(),
                "reconciled scan results"
            );
        }
        report
    }

    fn grant_pass(&mut self, current: &[ScanResult], report: &mut ReconcileReport) {
        for result in current {
            let id = result.target.id();
            let Some(target) = result.target.upgrade() else {
                trace!(target: "grasp::ledger", %id, "candidate vanished before reconciliation");
                continue;
            };
            if target.is_dead() {
                continue;
            }
            let Some(params) = target.parameters() else {
                debug!(target: "grasp::ledger", %id, "candidate has no interaction parameters; skipping");
                continue;
            };
            let Some(key) = params.capability.clone() else {
                debug!(target: "grasp::ledger", %id, "candidate grants no capability; skipping");
                continue;
            };
            if self.scan_grant.as_ref().is_some_and(|(scan, _)| *scan == key) {
                continue;
            }

            if let Some(record) = self.records.get_mut(&key) {
                if !record.is_persistent() && record.add_claimant(&result.target) {
                    trace!(target: "grasp::ledger", %key, %id, "claimant added");
                    self.events.publish_grant(GrantEvent::ClaimantAdded {
                        key: key.clone(),
                        target: id,
                    });
                    report.claimed.push((key, id));
                }
                continue;
            }

            if result.normalized_distance > params.grant_distance_threshold {
                trace!(
                    target: "grasp::ledger",
                    %key,
                    %id,
                    distance = result.normalized_distance,
                    threshold = params.grant_distance_threshold,
                    "candidate outside grant threshold"
                );
                continue;
            }

            let Some(registry) = &self.registry else {
                warn!(target: "grasp::ledger", %key, "no registry to grant through");
                continue;
            };
            let Some(handle) = registry.grant(&key).filter(GrantHandle::is_valid) else {
                warn!(target: "grasp::ledger", %key, %id, "registry refused grant; retrying next cycle");
                continue;
            };

            let manual_clear = params.manual_clear;
            self.records.insert(
                key.clone(),
                GrantRecord::claimed(key.clone(), handle, result.target.clone(), manual_clear),
            );
            self.hooks.post_grant(&GrantContext {
                key: &key,
                handle,
                target: Some(&result.target),
            });
            debug!(target: "grasp::ledger", %key, %handle, %id, manual_clear, "capability granted");
            self.events.publish_grant(GrantEvent::Granted {
                key: key.clone(),
                handle,
                target: Some(id),
                persistent: false,
            });
            report.granted.push(key);
        }
    }

    /// Releases the claims of targets that dropped out of the results.
    fn revoke_pass(
        &mut self,
        previous: &[ScanResult],
        current_ids: &HashSet<TargetId>,
        report: &mut ReconcileReport,
    ) {
        for result in previous {
            let id = result.target.id();
            if current_ids.contains(&id) {
                continue;
            }
            // Dead targets cannot be asked for their capability, so look the
            // records up by claimant instead.
            let keys: Vec<CapabilityKey> = self
                .records
                .values()
                .filter(|r| r.has_claimant(id))
                .map(|r| r.key().clone())
                .collect();
            for key in keys {
                self.release_claimant(&key, id, report);
            }
        }
    }

    fn release_claimant(&mut self, key: &CapabilityKey, id: TargetId, report: &mut ReconcileReport) {
        let Some(record) = self.records.get_mut(key) else {
            return;
        };
        if record.is_persistent() || record.is_manual_clear() {
            return;
        }
        record.prune_invalid();
        if record.is_locked() {
            debug!(target: "grasp::ledger", %key, %id, "grant locked; keeping claimant");
            return;
        }

        record.remove_claimant(id);
        let remaining = record.claimant_count();
        report.forfeited.push((key.clone(), id));
        if remaining == 0 {
            if self.revoke_record(key, RevokeReason::NoClaimants) {
                report.revoked.push(key.clone());
            }
        } else {
            self.events.publish_grant(GrantEvent::Forfeited {
                key: key.clone(),
                target: id,
                remaining,
            });
        }
    }

    /// Drops claimants that are dead or no longer scanned on unlocked,
    /// scan-driven records. Catches claims held back by a lock that has since
    /// been released.
    fn sweep_stale(&mut self, current_ids: &HashSet<TargetId>, report: &mut ReconcileReport) {
        let mut emptied = Vec::new();
        for record in self.records.values_mut() {
            if record.is_persistent() || record.is_manual_clear() {
                continue;
            }
            record.prune_invalid();
            if record.is_locked() {
                continue;
            }
            let dropped = record.retain_claimants(|c| current_ids.contains(&c.id()));
            let remaining = record.claimant_count();
            for id in dropped {
                report.forfeited.push((record.key().clone(), id));
                if remaining > 0 {
                    self.events.publish_grant(GrantEvent::Forfeited {
                        key: record.key().clone(),
                        target: id,
                        remaining,
                    });
                }
            }
            if remaining == 0 {
                emptied.push(record.key().clone());
            }
        }

        for key in emptied {
            if self.revoke_record(&key, RevokeReason::NoClaimants) {
                report.revoked.push(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use grasp_core::{CategoryKey, TargetRef};

    use super::super::tests::{door, ledger_with};
    use super::*;
    use crate::memory::InMemoryCapabilityRegistry;

    fn hit(target: &Arc<grasp_core::TargetActor>, distance: f32) -> ScanResult {
        ScanResult::new(CategoryKey::interact(), TargetRef::new(target), distance)
    }

    #[test]
    fn threshold_gates_only_the_first_grant() {
        let registry = Arc::new(InMemoryCapabilityRegistry::new());
        let mut ledger = ledger_with(&registry);
        let a = door(1, "ability.open");
        let key = CapabilityKey::new("ability.open");

        let report = ledger.reconcile(vec![hit(&a, 0.8)]);
        assert!(report.is_quiet());
        assert!(!ledger.is_granted(&key));

        let report = ledger.reconcile(vec![hit(&a, 0.65)]);
        assert_eq!(report.granted, vec![key.clone()]);

        // hysteresis: drifting back past the threshold keeps the grant
        let report = ledger.reconcile(vec![hit(&a, 0.9)]);
        assert!(report.is_quiet());
        assert!(ledger.is_granted(&key));
        assert_eq!(registry.live_grants(), 1);
    }

    #[test]
    fn shared_capability_survives_until_last_claimant_leaves() {
        let registry = Arc::new(InMemoryCapabilityRegistry::new());
        let mut ledger = ledger_with(&registry);
        let a = door(1, "ability.open");
        let b = door(2, "ability.open");
        let key = CapabilityKey::new("ability.open");

        ledger.reconcile(vec![hit(&a, 0.1), hit(&b, 0.9)]);
        assert_eq!(ledger.record(&key).map(GrantRecord::claimant_count), Some(2));

        let report = ledger.reconcile(vec![hit(&b, 0.9)]);
        assert_eq!(report.forfeited, vec![(key.clone(), TargetId(1))]);
        assert!(report.revoked.is_empty());

        let report = ledger.reconcile(Vec::new());
        assert_eq!(report.revoked, vec![key.clone()]);
        assert_eq!(registry.live_grants(), 0);
    }

    #[test]
    fn dead_claimant_is_revoked_without_reading_its_parameters() {
        let registry = Arc::new(InMemoryCapabilityRegistry::new());
        let mut ledger = ledger_with(&registry);
        let a = door(1, "ability.open");

        ledger.reconcile(vec![hit(&a, 0.1)]);
        drop(a);

        let report = ledger.reconcile(Vec::new());
        assert_eq!(report.revoked, vec![CapabilityKey::new("ability.open")]);
    }

    #[test]
    fn repeated_identical_results_change_nothing() {
        let registry = Arc::new(InMemoryCapabilityRegistry::new());
        let mut ledger = ledger_with(&registry);
        let a = door(1, "ability.open");

        ledger.reconcile(vec![hit(&a, 0.1)]);
        let before = ledger.snapshot();
        let report = ledger.reconcile(vec![hit(&a, 0.1)]);

        assert!(report.is_quiet());
        assert_eq!(ledger.snapshot(), before);
        assert_eq!(registry.grant_calls(), 1);
    }

    #[test]
    fn refused_grant_is_retried_next_cycle() {
        let registry = Arc::new(InMemoryCapabilityRegistry::new());
        let mut ledger = ledger_with(&registry);
        let a = door(1, "ability.open");

        registry.refuse_grants(true);
        assert!(ledger.reconcile(vec![hit(&a, 0.1)]).granted.is_empty());

        registry.refuse_grants(false);
        assert_eq!(ledger.reconcile(vec![hit(&a, 0.1)]).granted.len(), 1);
    }
}
