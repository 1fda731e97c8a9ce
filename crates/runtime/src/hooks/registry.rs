//! Hook registry that dispatches ledger extension points.

use std::sync::Arc;

use tracing::trace;

use super::{ActivationContext, GrantContext, GrantHook};

/// Priority-ordered set of [`GrantHook`]s.
#[derive(Clone)]
pub struct HookRegistry {
    hooks: Arc<[Arc<dyn GrantHook>]>,
}

impl HookRegistry {
    /// Creates a registry; hooks are sorted by priority (lower values first).
    pub fn new(mut hooks: Vec<Arc<dyn GrantHook>>) -> Self {
        hooks.sort_by_key(|h| h.priority());
        Self {
            hooks: hooks.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Returns the number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Returns true if no hooks are registered.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Returns an iterator over hook names and priorities (for debugging).
    pub fn hooks(&self) -> impl Iterator<Item = (&'static str, i32)> + '_ {
        self.hooks.iter().map(|h| (h.name(), h.priority()))
    }

    fn each(&self, point: &'static str, mut f: impl FnMut(&dyn GrantHook)) {
        for hook in self.hooks.iter() {
            trace!(target: "grasp::ledger", hook = hook.name(), point, "running hook");
            f(hook.as_ref());
        }
    }

    pub fn post_grant(&self, ctx: &GrantContext<'_>) {
        self.each("post_grant", |h| h.post_grant(ctx));
    }

    pub fn post_grant_persistent(&self, ctx: &GrantContext<'_>) {
        self.each("post_grant_persistent", |h| h.post_grant_persistent(ctx));
    }

    pub fn pre_clear(&self, ctx: &GrantContext<'_>) {
        self.each("pre_clear", |h| h.pre_clear(ctx));
    }

    pub fn pre_try_activate(&self, ctx: &ActivationContext<'_>) {
        self.each("pre_try_activate", |h| h.pre_try_activate(ctx));
    }

    pub fn post_activate(&self, ctx: &ActivationContext<'_>) {
        self.each("post_activate", |h| h.post_activate(ctx));
    }

    pub fn post_failed_activate(&self, ctx: &ActivationContext<'_>) {
        self.each("post_failed_activate", |h| h.post_failed_activate(ctx));
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::empty()
    }
}
