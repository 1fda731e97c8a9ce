//! Activation of granted capabilities on behalf of a target.
use std::sync::Arc;

use grasp_core::{ActivationSource, CapabilityKey, GrantHandle, Interactable, TargetRef};
use tracing::{debug, trace};

use super::GrantLedger;
use crate::api::{ActivateError, ActivationRequest};
use crate::events::GrantEvent;
use crate::hooks::ActivationContext;

impl GrantLedger {
    fn activation_grant(
        &self,
        target: &TargetRef,
    ) -> Result<(CapabilityKey, GrantHandle, Arc<dyn Interactable>), ActivateError> {
        let id = target.id();
        let live = target
            .upgrade()
            .filter(|t| !t.is_dead())
            .ok_or(ActivateError::TargetGone(id))?;
        let key = live
            .parameters()
            .and_then(|p| p.capability.clone())
            .ok_or(ActivateError::NoCapability(id))?;
        let handle = self
            .records
            .get(&key)
            .map(|r| r.handle())
            .ok_or_else(|| ActivateError::NotGranted(key.clone()))?;
        Ok((key, handle, live))
    }

    /// True if the capability `target` publishes is granted and idle.
    pub fn can_activate(&self, target: &TargetRef, source: ActivationSource) -> bool {
        let Some(registry) = &self.registry else {
            return false;
        };
        match self.activation_grant(target) {
            Ok((_, handle, _)) => registry.can_activate(handle),
            Err(err) => {
                trace!(target: "grasp::ledger", candidate = %target.id(), %source, %err, "cannot activate");
                false
            }
        }
    }

    /// Activates the capability `target` publishes through the registry.
    ///
    /// The target's payload travels with the request only for
    /// [`ActivationSource::EventData`].
    pub fn try_activate(
        &self,
        target: &TargetRef,
        source: ActivationSource,
    ) -> Result<(), ActivateError> {
        let (key, handle, live) = self.activation_grant(target)?;
        let registry = self
            .registry
            .as_ref()
            .ok_or(ActivateError::RegistryUnavailable)?;

        let ctx = ActivationContext {
            key: &key,
            handle,
            target,
            source,
        };
        self.hooks.pre_try_activate(&ctx);

        let request = ActivationRequest {
            target: target.id(),
            source,
            payload: if source.sends_payload() {
                live.payload()
            } else {
                Vec::new()
            },
        };
        let success = registry.try_activate(handle, &request);

        if success {
            self.hooks.post_activate(&ctx);
        } else {
            self.hooks.post_failed_activate(&ctx);
        }
        debug!(target: "grasp::ledger", %key, candidate = %target.id(), %source, success, "activation attempted");
        self.events.publish_grant(GrantEvent::Activated {
            key: key.clone(),
            target: target.id(),
            success,
        });

        if success {
            Ok(())
        } else {
            Err(ActivateError::Rejected(key))
        }
    }
}
