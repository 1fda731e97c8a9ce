//! Lifecycle hooks around grants and activations.
//!
//! Hooks observe the ledger at fixed extension points: after a grant, after
//! a persistent grant, before a clear, and around activation. They run on
//! the worker task in priority order and cannot veto anything.
//!
//! Lower priority values run first:
//! - `-100..0`: bookkeeping that other hooks rely on
//! - `0`: default
//! - `1..100`: cosmetic or diagnostic hooks

mod registry;

pub use registry::HookRegistry;

use grasp_core::{ActivationSource, CapabilityKey, GrantHandle, TargetRef};

/// A grant the hook is being told about.
#[derive(Debug, Clone, Copy)]
pub struct GrantContext<'a> {
    pub key: &'a CapabilityKey,
    pub handle: GrantHandle,
    /// The claimant that caused a scan-driven grant. `None` for persistent
    /// and scan capabilities.
    pub target: Option<&'a TargetRef>,
}

/// An activation the hook is being told about.
#[derive(Debug, Clone, Copy)]
pub struct ActivationContext<'a> {
    pub key: &'a CapabilityKey,
    pub handle: GrantHandle,
    pub target: &'a TargetRef,
    pub source: ActivationSource,
}

/// Extension points of the grant ledger. Every method defaults to a no-op.
pub trait GrantHook: Send + Sync {
    /// Returns a human-readable name for this hook (used in logging).
    fn name(&self) -> &'static str;

    fn priority(&self) -> i32 {
        0
    }

    fn post_grant(&self, _ctx: &GrantContext<'_>) {}

    fn post_grant_persistent(&self, _ctx: &GrantContext<'_>) {}

    fn pre_clear(&self, _ctx: &GrantContext<'_>) {}

    fn pre_try_activate(&self, _ctx: &ActivationContext<'_>) {}

    fn post_activate(&self, _ctx: &ActivationContext<'_>) {}

    fn post_failed_activate(&self, _ctx: &ActivationContext<'_>) {}
}
