//! The evaluating agent's side of an interaction check.
use crate::math::Vec3;

/// Network role of the evaluating agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NetMode {
    #[default]
    Standalone,
    Client,
    ListenServer,
    DedicatedServer,
}

/// Where the agent stands, where it faces, and whether its checks are
/// authoritative.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InteractorContext {
    pub location: Vec3,
    pub forward: Vec3,
    pub has_authority: bool,
    pub net_mode: NetMode,
}

impl Default for InteractorContext {
    fn default() -> Self {
        Self::local(Vec3::ZERO, Vec3::FORWARD)
    }
}

impl InteractorContext {
    /// Non-networked agent; tolerance never applies.
    pub fn local(location: Vec3, forward: Vec3) -> Self {
        Self {
            location,
            forward,
            has_authority: true,
            net_mode: NetMode::Standalone,
        }
    }

    pub fn networked(location: Vec3, forward: Vec3, has_authority: bool, net_mode: NetMode) -> Self {
        Self {
            location,
            forward,
            has_authority,
            net_mode,
        }
    }

    /// Authoritative checks in a networked session are evaluated with the
    /// target's tolerance percentages applied.
    pub fn applies_tolerance(&self) -> bool {
        self.has_authority && self.net_mode != NetMode::Standalone
    }

    pub fn with_location(mut self, location: Vec3) -> Self {
        self.location = location;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerance_requires_authority_in_networked_session() {
        let origin = Vec3::ZERO;
        assert!(!InteractorContext::local(origin, Vec3::FORWARD).applies_tolerance());
        assert!(
            InteractorContext::networked(origin, Vec3::FORWARD, true, NetMode::ListenServer)
                .applies_tolerance()
        );
        assert!(
            !InteractorContext::networked(origin, Vec3::FORWARD, false, NetMode::Client)
                .applies_tolerance()
        );
    }
}
