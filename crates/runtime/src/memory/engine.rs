//! In-memory SpatialQueryEngine over a shared list of targets.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};

use grasp_core::{Interactable, TargetRef, admits_all};
use tracing::trace;

use crate::api::{
    CompletionSender, OverlapHit, QueryCompletion, RequestHandle, ScanRequest, SpatialQueryEngine,
};

/// When accepted queries report back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeliveryMode {
    /// The completion is sent before `start_request` returns.
    #[default]
    Immediate,
    /// Queries wait until [`InMemoryQueryEngine::complete_pending`].
    Manual,
}

struct PendingQuery {
    request: ScanRequest,
    completions: CompletionSender,
}

#[derive(Default)]
struct EngineState {
    next_handle: u64,
    pending: BTreeMap<RequestHandle, PendingQuery>,
    started: usize,
    removed: usize,
}

/// Overlap engine that tests every registered target against the preset
/// shape and then runs the preset's filter chain.
///
/// Hits report the shape's effective radius as their distance, matching
/// engines that do not compute a metric distance for overlaps.
#[derive(Default)]
pub struct InMemoryQueryEngine {
    world: RwLock<Vec<Arc<dyn Interactable>>>,
    state: Mutex<EngineState>,
    mode: DeliveryMode,
}

impl InMemoryQueryEngine {
    pub fn new(mode: DeliveryMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn insert(&self, target: Arc<dyn Interactable>) {
        if let Ok(mut world) = self.world.write() {
            world.push(target);
        }
    }

    /// Drops the engine's strong reference to every target with `id`.
    pub fn remove(&self, id: grasp_core::TargetId) {
        if let Ok(mut world) = self.world.write() {
            world.retain(|t| t.id() != id);
        }
    }

    pub fn target_count(&self) -> usize {
        self.world.read().map(|w| w.len()).unwrap_or(0)
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().map(|s| s.pending.len()).unwrap_or(0)
    }

    /// Accepted queries so far.
    pub fn started_count(&self) -> usize {
        self.state.lock().map(|s| s.started).unwrap_or(0)
    }

    /// Queries cancelled through `remove_request`.
    pub fn removed_count(&self) -> usize {
        self.state.lock().map(|s| s.removed).unwrap_or(0)
    }

    /// Runs and delivers every pending query. Returns how many were sent.
    pub fn complete_pending(&self) -> usize {
        let pending = match self.state.lock() {
            Ok(mut state) => std::mem::take(&mut state.pending),
            Err(_) => return 0,
        };
        pending
            .into_iter()
            .filter(|(handle, query)| self.deliver(*handle, &query.request, &query.completions))
            .count()
    }

    /// Forgets every pending query without reporting back, as an engine that
    /// loses in-flight requests would. Returns how many were dropped.
    pub fn drop_pending(&self) -> usize {
        self.state
            .lock()
            .map(|mut s| std::mem::take(&mut s.pending).len())
            .unwrap_or(0)
    }

    fn overlap(&self, request: &ScanRequest) -> Vec<OverlapHit> {
        let Ok(world) = self.world.read() else {
            return Vec::new();
        };
        let ctx = &request.source.context;
        let origin = request.preset.origin(ctx, request.source.view_location);
        let radius = request.preset.shape.effective_radius();

        world
            .iter()
            .filter(|t| {
                request
                    .preset
                    .shape
                    .contains(origin.location, origin.yaw, t.location())
            })
            .filter(|t| admits_all(&request.preset.filters, ctx, t.as_ref(), &request.category))
            .map(|t| OverlapHit {
                target: TargetRef::from_dyn(t),
                trace_start: origin.location,
                reported_distance: radius,
            })
            .collect()
    }

    fn deliver(
        &self,
        handle: RequestHandle,
        request: &ScanRequest,
        completions: &CompletionSender,
    ) -> bool {
        let hits = self.overlap(request);
        trace!(target: "grasp::scan", handle = handle.0, category = %request.category, hits = hits.len(), "query completed");
        completions.send(QueryCompletion {
            handle,
            category: request.category.clone(),
            hits,
        })
    }
}

impl SpatialQueryEngine for InMemoryQueryEngine {
    fn start_request(
        &self,
        request: ScanRequest,
        completions: CompletionSender,
    ) -> Option<RequestHandle> {
        if !request.preset.has_work() {
            return None;
        }
        let handle = {
            let mut state = self.state.lock().ok()?;
            state.next_handle += 1;
            state.started += 1;
            RequestHandle(state.next_handle)
        };

        match self.mode {
            DeliveryMode::Immediate => {
                self.deliver(handle, &request, &completions);
            }
            DeliveryMode::Manual => {
                let mut state = self.state.lock().ok()?;
                state.pending.insert(
                    handle,
                    PendingQuery {
                        request,
                        completions,
                    },
                );
            }
        }
        Some(handle)
    }

    fn remove_request(&self, handle: RequestHandle) {
        if let Ok(mut state) = self.state.lock()
            && state.pending.remove(&handle).is_some()
        {
            state.removed += 1;
        }
    }
}
