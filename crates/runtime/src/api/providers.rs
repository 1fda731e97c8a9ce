//! Contracts for the collaborators the grasp runtime drives but does not own.
//!
//! - [`CapabilityRegistry`] holds, activates and revokes granted capabilities.
//! - [`SpatialQueryEngine`] runs overlap queries and reports back
//!   asynchronously through a [`CompletionSender`].
//! - [`AgentProvider`] tells the worker where the agent is and which registry
//!   serves it.
//!
//! All three are injected at build time; nothing is looked up globally.
use std::collections::BTreeMap;
use std::sync::Arc;

use grasp_core::{
    ActivationSource, CapabilityKey, CategoryKey, GrantHandle, InteractorContext, PayloadItem,
    QueryPreset, ScanSourceSelection, TargetId, TargetRef, Vec3,
};
use tokio::sync::mpsc;

/// What the registry knows about a live grant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapabilitySpec {
    pub handle: GrantHandle,
    pub key: CapabilityKey,
    /// Currently running an activation.
    pub active: bool,
}

/// Data sent along with an activation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActivationRequest {
    pub target: TargetId,
    pub source: ActivationSource,
    /// Empty unless the source sends the target's payload.
    pub payload: Vec<PayloadItem>,
}

/// External holder of granted capabilities.
///
/// A grant may fail; the ledger logs and retries on a later cycle.
pub trait CapabilityRegistry: Send + Sync {
    fn grant(&self, key: &CapabilityKey) -> Option<GrantHandle>;

    fn revoke(&self, handle: GrantHandle);

    fn find_spec(&self, handle: GrantHandle) -> Option<CapabilitySpec>;

    fn can_activate(&self, handle: GrantHandle) -> bool {
        self.find_spec(handle).is_some_and(|spec| !spec.active)
    }

    /// Returns true if the capability started.
    fn try_activate(&self, handle: GrantHandle, request: &ActivationRequest) -> bool;
}

/// Where and how the agent scans from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScanSource {
    pub context: InteractorContext,
    /// Camera location for presets centred on the view.
    pub view_location: Option<Vec3>,
}

impl ScanSource {
    pub fn new(context: InteractorContext) -> Self {
        Self {
            context,
            view_location: None,
        }
    }
}

/// Identifies an in-flight query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestHandle(pub u64);

/// One query to run against the world.
#[derive(Clone, Debug)]
pub struct ScanRequest {
    pub category: CategoryKey,
    pub preset: QueryPreset,
    pub source: ScanSource,
}

/// A filtered overlap hit.
///
/// Engines report the preset's radius in `reported_distance`, not a metric
/// distance; consumers recompute distance from `trace_start`.
#[derive(Clone, Debug)]
pub struct OverlapHit {
    pub target: TargetRef,
    pub trace_start: Vec3,
    pub reported_distance: f32,
}

/// Results of one finished query.
#[derive(Clone, Debug)]
pub struct QueryCompletion {
    pub handle: RequestHandle,
    pub category: CategoryKey,
    pub hits: Vec<OverlapHit>,
}

/// Delivers query completions back to the worker that issued them.
#[derive(Clone, Debug)]
pub struct CompletionSender(mpsc::UnboundedSender<QueryCompletion>);

impl CompletionSender {
    pub fn new(tx: mpsc::UnboundedSender<QueryCompletion>) -> Self {
        Self(tx)
    }

    /// Returns false once the worker has gone away.
    pub fn send(&self, completion: QueryCompletion) -> bool {
        self.0.send(completion).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

/// External spatial query engine.
pub trait SpatialQueryEngine: Send + Sync {
    /// Starts a query. `None` means the request was not accepted (e.g. the
    /// preset has no query work) and no completion will arrive.
    fn start_request(
        &self,
        request: ScanRequest,
        completions: CompletionSender,
    ) -> Option<RequestHandle>;

    /// Cancels a query; its completion must not be delivered afterwards.
    fn remove_request(&self, handle: RequestHandle);
}

/// The agent the worker scans for.
pub trait AgentProvider: Send + Sync {
    /// The controlled pawn, if any.
    fn pawn(&self) -> Option<ScanSource>;

    /// The controller itself.
    fn controller(&self) -> Option<ScanSource>;

    /// `None` while the agent's registry is not available yet.
    fn capability_registry(&self) -> Option<Arc<dyn CapabilityRegistry>>;

    /// Presets the agent wants now. `None` keeps the configured presets.
    fn presets(&self) -> Option<BTreeMap<CategoryKey, QueryPreset>> {
        None
    }
}

/// Picks the scan source for `selection`.
pub fn resolve_scan_source(
    agent: &dyn AgentProvider,
    selection: ScanSourceSelection,
) -> Option<ScanSource> {
    match selection {
        ScanSourceSelection::Pawn => agent.pawn(),
        ScanSourceSelection::PawnIfValid => agent.pawn().or_else(|| agent.controller()),
        ScanSourceSelection::Controller => agent.controller(),
    }
}
