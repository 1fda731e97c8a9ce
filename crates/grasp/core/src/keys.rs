//! Opaque identifiers for capabilities and query channels.
use std::fmt;

/// Identifies a grantable capability class (e.g. an "open door" ability).
///
/// The ledger keys its records by this value; the capability registry turns
/// it into a live grant.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct CapabilityKey(String);

impl CapabilityKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CapabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CapabilityKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Tag naming a query channel (preset) that the orchestrator scans through.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct CategoryKey(String);

impl CategoryKey {
    /// Default channel used when an agent configures nothing else.
    pub const INTERACT: &'static str = "grasp.interact";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn interact() -> Self {
        Self::new(Self::INTERACT)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CategoryKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
