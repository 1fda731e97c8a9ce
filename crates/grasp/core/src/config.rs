//! Agent-level configuration surface.
use std::collections::BTreeMap;

use crate::keys::{CapabilityKey, CategoryKey};
use crate::scan::QueryPreset;

/// Which object scans are issued from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ScanSourceSelection {
    /// The controlled pawn; scanning waits while there is none.
    Pawn,
    /// The controlled pawn when there is one, otherwise the controller.
    #[default]
    PawnIfValid,
    /// Always the controller.
    Controller,
}

/// Per-agent configuration of the grasp stack.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GraspConfig {
    /// Capabilities granted at initialisation and never revoked by scans.
    pub persistent: Vec<CapabilityKey>,
    /// Capability that performs the scanning itself, granted at initialisation.
    pub scan_capability: Option<CapabilityKey>,
    /// Query channels, each with its own preset.
    pub presets: BTreeMap<CategoryKey, QueryPreset>,
    pub scan_source: ScanSourceSelection,

    /// Minimum seconds between scan cycles. Zero disables rate limiting.
    pub max_scan_rate: f32,
    /// Seconds to wait before retrying after a transient or configuration error.
    pub error_wait_delay: f32,
    /// Seconds a cycle may stay outstanding before it is force-reset.
    pub failsafe_delay: f32,

    /// Re-read presets from the agent every time a cycle is requested.
    pub update_presets_on_request: bool,
    pub update_presets_on_possession_change: bool,
    pub end_requests_on_possession_change: bool,
}

impl GraspConfig {
    pub const DEFAULT_MAX_SCAN_RATE: f32 = 0.0;
    pub const DEFAULT_ERROR_WAIT_DELAY: f32 = 0.5;
    pub const DEFAULT_FAILSAFE_DELAY: f32 = 2.0;
    /// Longest value, in seconds, any of the timing fields may hold.
    pub const MAX_DELAY: f32 = 86_400.0;

    pub fn new() -> Self {
        let mut presets = BTreeMap::new();
        presets.insert(CategoryKey::interact(), QueryPreset::default());
        Self {
            persistent: Vec::new(),
            scan_capability: None,
            presets,
            scan_source: ScanSourceSelection::default(),
            max_scan_rate: Self::DEFAULT_MAX_SCAN_RATE,
            error_wait_delay: Self::DEFAULT_ERROR_WAIT_DELAY,
            failsafe_delay: Self::DEFAULT_FAILSAFE_DELAY,
            update_presets_on_request: false,
            update_presets_on_possession_change: true,
            end_requests_on_possession_change: true,
        }
    }

    pub fn with_preset(mut self, category: impl Into<CategoryKey>, preset: QueryPreset) -> Self {
        self.presets.insert(category.into(), preset);
        self
    }

    pub fn with_persistent(mut self, key: impl Into<CapabilityKey>) -> Self {
        self.persistent.push(key.into());
        self
    }

    pub fn with_scan_capability(mut self, key: impl Into<CapabilityKey>) -> Self {
        self.scan_capability = Some(key.into());
        self
    }

    pub fn with_max_scan_rate(mut self, seconds: f32) -> Self {
        self.max_scan_rate = seconds;
        self
    }
}

impl Default for GraspConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_scans_the_interact_channel() {
        let config = GraspConfig::default();
        assert!(config.presets.contains_key(&CategoryKey::interact()));
        assert_eq!(config.error_wait_delay, 0.5);
        assert_eq!(config.failsafe_delay, 2.0);
    }
}
