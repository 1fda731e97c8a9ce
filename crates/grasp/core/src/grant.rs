//! Grant-side vocabulary shared by the ledger and its callers.
use bitflags::bitflags;

/// Opaque handle issued by the capability registry for one live grant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct GrantHandle(pub u64);

impl GrantHandle {
    /// Registries never issue this value.
    pub const INVALID: Self = Self(0);

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl core::fmt::Display for GrantHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "grant#{}", self.0)
    }
}

bitflags! {
    /// Which otherwise-protected grants a manual clear may revoke.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct ClearFlags: u8 {
        /// Revoke even while a reachable candidate still claims the grant.
        const IN_RANGE   = 1 << 0;
        /// Revoke even while a lock is held.
        const LOCKED     = 1 << 1;
        /// Include persistent grants (bulk clear only).
        const PERSISTENT = 1 << 2;
        /// Include the scan capability (bulk clear only).
        const SCAN       = 1 << 3;
    }
}

impl ClearFlags {
    /// Everything the ledger holds.
    pub fn everything() -> Self {
        Self::all()
    }
}

/// How an activation request was produced, and therefore whether the
/// target's payload travels with it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActivationSource {
    /// Triggered as an event carrying the target and its payload.
    #[default]
    EventData,
    /// Activated directly; the target is attached as the source object only.
    Automatic,
    /// Caller builds its own payload; the target's payload is not attached.
    Custom,
}

impl ActivationSource {
    pub fn sends_payload(&self) -> bool {
        matches!(self, Self::EventData)
    }
}
