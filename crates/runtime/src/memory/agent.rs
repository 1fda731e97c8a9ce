//! In-memory AgentProvider with a possessable pawn.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use grasp_core::{CategoryKey, InteractorContext, QueryPreset, Vec3};

use crate::api::{AgentProvider, CapabilityRegistry, ScanSource};

#[derive(Default)]
struct AgentState {
    pawn: Option<ScanSource>,
    controller: Option<ScanSource>,
    registry: Option<Arc<dyn CapabilityRegistry>>,
    presets: Option<BTreeMap<CategoryKey, QueryPreset>>,
}

/// An agent whose pawn, registry and presets can be swapped at runtime.
#[derive(Default)]
pub struct InMemoryAgent {
    state: RwLock<AgentState>,
}

impl InMemoryAgent {
    /// An agent controlling a pawn at `context`.
    pub fn with_pawn(context: InteractorContext) -> Self {
        let agent = Self::default();
        agent.possess(context);
        agent
    }

    pub fn with_registry(self, registry: Arc<dyn CapabilityRegistry>) -> Self {
        self.set_registry(Some(registry));
        self
    }

    pub fn set_registry(&self, registry: Option<Arc<dyn CapabilityRegistry>>) {
        if let Ok(mut state) = self.state.write() {
            state.registry = registry;
        }
    }

    pub fn possess(&self, context: InteractorContext) {
        if let Ok(mut state) = self.state.write() {
            state.pawn = Some(ScanSource::new(context));
        }
    }

    pub fn unpossess(&self) {
        if let Ok(mut state) = self.state.write() {
            state.pawn = None;
        }
    }

    pub fn set_controller(&self, source: Option<ScanSource>) {
        if let Ok(mut state) = self.state.write() {
            state.controller = source;
        }
    }

    /// Moves the pawn, keeping its facing. No-op without a pawn.
    pub fn move_to(&self, location: Vec3) {
        if let Ok(mut state) = self.state.write()
            && let Some(pawn) = state.pawn.as_mut()
        {
            pawn.context = pawn.context.with_location(location);
        }
    }

    pub fn face(&self, forward: Vec3) {
        if let Ok(mut state) = self.state.write()
            && let Some(pawn) = state.pawn.as_mut()
        {
            pawn.context.forward = forward;
        }
    }

    /// Presets reported to the worker when it re-reads them.
    pub fn set_presets(&self, presets: Option<BTreeMap<CategoryKey, QueryPreset>>) {
        if let Ok(mut state) = self.state.write() {
            state.presets = presets;
        }
    }
}

impl AgentProvider for InMemoryAgent {
    fn pawn(&self) -> Option<ScanSource> {
        self.state.read().ok()?.pawn
    }

    fn controller(&self) -> Option<ScanSource> {
        self.state.read().ok()?.controller
    }

    fn capability_registry(&self) -> Option<Arc<dyn CapabilityRegistry>> {
        self.state.read().ok()?.registry.clone()
    }

    fn presets(&self) -> Option<BTreeMap<CategoryKey, QueryPreset>> {
        self.state.read().ok()?.presets.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grasp_core::ScanSourceSelection;

    use crate::api::resolve_scan_source;

    #[test]
    fn source_selection_falls_back_to_controller() {
        let agent = InMemoryAgent::default();
        let controller = ScanSource::new(InteractorContext::local(Vec3::new(1.0, 0.0, 0.0), Vec3::FORWARD));
        agent.set_controller(Some(controller));

        assert!(resolve_scan_source(&agent, ScanSourceSelection::Pawn).is_none());
        assert_eq!(resolve_scan_source(&agent, ScanSourceSelection::PawnIfValid), Some(controller));

        agent.possess(InteractorContext::default());
        agent.move_to(Vec3::new(5.0, 0.0, 0.0));
        let pawn = resolve_scan_source(&agent, ScanSourceSelection::PawnIfValid).unwrap();
        assert_eq!(pawn.context.location, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(resolve_scan_source(&agent, ScanSourceSelection::Controller), Some(controller));
    }
}
