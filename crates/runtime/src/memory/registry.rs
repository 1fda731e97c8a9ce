//! In-memory CapabilityRegistry implementation.

use std::collections::BTreeMap;
use std::sync::RwLock;

use grasp_core::{CapabilityKey, GrantHandle};
use tracing::trace;

use crate::api::{ActivationRequest, CapabilityRegistry, CapabilitySpec};

#[derive(Default)]
struct RegistryState {
    next_handle: u64,
    specs: BTreeMap<GrantHandle, CapabilitySpec>,
    activations: Vec<ActivationRequest>,
    grant_calls: usize,
    refuse_grants: bool,
    refuse_activations: bool,
}

/// Capability registry that records every call.
///
/// Handles count up from 1. Grants and activations can be made to fail on
/// demand to exercise the retry paths.
#[derive(Default)]
pub struct InMemoryCapabilityRegistry {
    state: RwLock<RegistryState>,
}

impl InMemoryCapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of grants currently held.
    pub fn live_grants(&self) -> usize {
        self.state.read().map(|s| s.specs.len()).unwrap_or(0)
    }

    /// Keys of the grants currently held, one entry per grant.
    pub fn granted_keys(&self) -> Vec<CapabilityKey> {
        self.state
            .read()
            .map(|s| s.specs.values().map(|spec| spec.key.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of `grant` calls, refused ones included.
    pub fn grant_calls(&self) -> usize {
        self.state.read().map(|s| s.grant_calls).unwrap_or(0)
    }

    /// Successful activations, oldest first.
    pub fn activations(&self) -> Vec<ActivationRequest> {
        self.state
            .read()
            .map(|s| s.activations.clone())
            .unwrap_or_default()
    }

    pub fn refuse_grants(&self, refuse: bool) {
        if let Ok(mut state) = self.state.write() {
            state.refuse_grants = refuse;
        }
    }

    pub fn refuse_activations(&self, refuse: bool) {
        if let Ok(mut state) = self.state.write() {
            state.refuse_activations = refuse;
        }
    }

    /// Marks a grant as running (or finished) an activation.
    pub fn set_active(&self, handle: GrantHandle, active: bool) {
        if let Ok(mut state) = self.state.write()
            && let Some(spec) = state.specs.get_mut(&handle)
        {
            spec.active = active;
        }
    }
}

impl CapabilityRegistry for InMemoryCapabilityRegistry {
    fn grant(&self, key: &CapabilityKey) -> Option<GrantHandle> {
        let mut state = self.state.write().ok()?;
        state.grant_calls += 1;
        if state.refuse_grants {
            return None;
        }
        state.next_handle += 1;
        let handle = GrantHandle(state.next_handle);
        state.specs.insert(
            handle,
            CapabilitySpec {
                handle,
                key: key.clone(),
                active: false,
            },
        );
        trace!(target: "grasp::ledger", %key, %handle, "registry granted");
        Some(handle)
    }

    fn revoke(&self, handle: GrantHandle) {
        if let Ok(mut state) = self.state.write() {
            state.specs.remove(&handle);
        }
    }

    fn find_spec(&self, handle: GrantHandle) -> Option<CapabilitySpec> {
        self.state.read().ok()?.specs.get(&handle).cloned()
    }

    fn try_activate(&self, handle: GrantHandle, request: &ActivationRequest) -> bool {
        let Ok(mut state) = self.state.write() else {
            return false;
        };
        let idle = state.specs.get(&handle).is_some_and(|spec| !spec.active);
        if !idle || state.refuse_activations {
            return false;
        }
        state.activations.push(request.clone());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grasp_core::{ActivationSource, TargetId};

    #[test]
    fn handles_are_unique_and_revocable() {
        let registry = InMemoryCapabilityRegistry::new();
        let key = CapabilityKey::new("ability.open");
        let first = registry.grant(&key).unwrap();
        let second = registry.grant(&key).unwrap();

        assert_ne!(first, second);
        assert!(first.is_valid());
        assert_eq!(registry.live_grants(), 2);

        registry.revoke(first);
        assert!(registry.find_spec(first).is_none());
        assert!(registry.can_activate(second));
    }

    #[test]
    fn busy_grant_cannot_activate() {
        let registry = InMemoryCapabilityRegistry::new();
        let handle = registry.grant(&CapabilityKey::new("ability.open")).unwrap();
        registry.set_active(handle, true);

        let request = ActivationRequest {
            target: TargetId(1),
            source: ActivationSource::Automatic,
            payload: Vec::new(),
        };
        assert!(!registry.can_activate(handle));
        assert!(!registry.try_activate(handle, &request));
        assert!(registry.activations().is_empty());
    }
}
