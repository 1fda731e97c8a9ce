//! Scan worker that owns the agent's [`GrantLedger`].
//!
//! Drives one scan cycle at a time: issue a query per preset, wait for every
//! completion, reconcile the ledger, then start again. Rate limiting, error
//! backoff and the failsafe are single-shot deadlines polled by the same
//! `select!` loop that receives commands, so every mutation happens on this
//! task.

use std::collections::{BTreeMap, HashSet};
use std::future;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use grasp_core::{
    ActivationSource, CapabilityKey, CategoryKey, ClearFlags, GraspConfig,
    GraspError, QueryPreset, ScanResult, TargetFilter, TargetId, TargetRef,
    normalized_scan_distance,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};
use tracing::{debug, error, info, trace, warn};

use crate::api::{
    ActivateError, AgentProvider, CompletionSender, OverlapHit, QueryCompletion, RequestHandle,
    ScanError, ScanRequest, SpatialQueryEngine, resolve_scan_source,
};
use crate::events::{EventBus, ScanEvent, ScanHit};
use crate::ledger::{GrantLedger, LedgerSnapshot};

/// Commands that can be sent to the scan worker.
pub enum Command {
    /// Pause or resume scanning. Pausing clears any pending wait and may end
    /// the outstanding queries.
    SetPaused {
        paused: bool,
        end_requests: bool,
        reply: oneshot::Sender<()>,
    },
    /// Cancel every outstanding query; optionally request a new cycle.
    EndRequests {
        notify: bool,
        reply: oneshot::Sender<usize>,
    },
    /// Ask for a cycle unless one is in flight or a wait is pending.
    RequestScan { reply: oneshot::Sender<()> },
    /// The agent's pawn changed.
    PossessionChanged { reply: oneshot::Sender<()> },
    ReplacePresets {
        presets: BTreeMap<CategoryKey, QueryPreset>,
        reply: oneshot::Sender<()>,
    },
    /// Re-attach the registry and grant persistent and scan capabilities.
    Initialize {
        reply: oneshot::Sender<Result<usize, ScanError>>,
    },
    ClearGranted {
        key: CapabilityKey,
        flags: ClearFlags,
        reply: oneshot::Sender<bool>,
    },
    ClearGrantedForTarget {
        target: TargetRef,
        flags: ClearFlags,
        reply: oneshot::Sender<usize>,
    },
    ClearAll {
        flags: ClearFlags,
        reply: oneshot::Sender<usize>,
    },
    AddLock {
        key: CapabilityKey,
        holder: TargetRef,
        reply: oneshot::Sender<bool>,
    },
    RemoveLock {
        key: CapabilityKey,
        holder: TargetId,
        reply: oneshot::Sender<bool>,
    },
    IsInRange {
        key: CapabilityKey,
        reply: oneshot::Sender<bool>,
    },
    CanActivate {
        target: TargetRef,
        source: ActivationSource,
        reply: oneshot::Sender<bool>,
    },
    TryActivate {
        target: TargetRef,
        source: ActivationSource,
        reply: oneshot::Sender<Result<(), ActivateError>>,
    },
    Snapshot { reply: oneshot::Sender<LedgerSnapshot> },
    Status { reply: oneshot::Sender<ScanStatus> },
    /// Remove outstanding queries and stop the worker.
    Shutdown { reply: oneshot::Sender<()> },
}

/// Orchestrator state as seen from outside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatus {
    pub paused: bool,
    /// The scan capability was cleared; scanning resumes after re-initialising.
    pub stopped: bool,
    pub outstanding: usize,
    pub waiting: bool,
    pub cycles: u64,
    pub presets: Vec<CategoryKey>,
}

/// Background task that scans for targets and keeps the ledger current.
pub struct ScanWorker {
    config: GraspConfig,
    presets: BTreeMap<CategoryKey, QueryPreset>,
    agent: Arc<dyn AgentProvider>,
    engine: Arc<dyn SpatialQueryEngine>,
    ledger: GrantLedger,
    events: EventBus,
    command_rx: mpsc::Receiver<Command>,
    completion_tx: mpsc::UnboundedSender<QueryCompletion>,
    completion_rx: mpsc::UnboundedReceiver<QueryCompletion>,

    outstanding: BTreeMap<RequestHandle, CategoryKey>,
    cycle_results: Vec<ScanResult>,
    wait_until: Option<Instant>,
    failsafe_at: Option<Instant>,
    last_cycle_at: Option<Instant>,
    initialized: bool,
    paused: bool,
    stopped: bool,
    cycles: u64,
    /// Error codes already logged at full level since the last good cycle.
    reported: HashSet<&'static str>,
}

impl ScanWorker {
    pub fn new(
        config: GraspConfig,
        agent: Arc<dyn AgentProvider>,
        engine: Arc<dyn SpatialQueryEngine>,
        ledger: GrantLedger,
        events: EventBus,
        command_rx: mpsc::Receiver<Command>,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            presets: config.presets.clone(),
            config,
            agent,
            engine,
            ledger,
            events,
            command_rx,
            completion_tx,
            completion_rx,
            outstanding: BTreeMap::new(),
            cycle_results: Vec::new(),
            wait_until: None,
            failsafe_at: None,
            last_cycle_at: None,
            initialized: false,
            paused: false,
            stopped: false,
            cycles: 0,
            reported: HashSet::new(),
        }
    }

    /// Main worker loop.
    pub async fn run(mut self) {
        info!(
            target: "grasp::scan",
            presets = self.presets.len(),
            source = %self.config.scan_source,
            "scan worker started"
        );
        self.request_scan();

        loop {
            let wait_until = self.wait_until;
            let failsafe_at = self.failsafe_at;

            // Completions first, so a command always sees every result the
            // engine has already delivered.
            tokio::select! {
                biased;

                Some(completion) = self.completion_rx.recv() => {
                    self.on_completion(completion);
                }
                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => {
                        if self.handle_command(cmd).is_break() {
                            break;
                        }
                    }
                    None => {
                        debug!(target: "grasp::scan", "command channel closed");
                        break;
                    }
                },
                _ = sleep_until(wait_until) => {
                    self.wait_until = None;
                    self.request_scan();
                }
                _ = sleep_until(failsafe_at) => {
                    self.failsafe_at = None;
                    self.on_failsafe();
                }
            }
        }

        self.teardown();
        info!(target: "grasp::scan", cycles = self.cycles, "scan worker stopped");
    }

    fn handle_command(&mut self, cmd: Command) -> ControlFlow<()> {
        match cmd {
            Command::SetPaused {
                paused,
                end_requests,
                reply,
            } => {
                self.set_paused(paused, end_requests);
                let _ = reply.send(());
            }
            Command::EndRequests { notify, reply } => {
                let _ = reply.send(self.end_requests(notify));
            }
            Command::RequestScan { reply } => {
                self.on_request();
                let _ = reply.send(());
            }
            Command::PossessionChanged { reply } => {
                self.possession_changed();
                let _ = reply.send(());
            }
            Command::ReplacePresets { presets, reply } => {
                self.replace_presets(presets);
                self.on_request();
                let _ = reply.send(());
            }
            Command::Initialize { reply } => {
                let _ = reply.send(self.reinitialize());
            }
            Command::ClearGranted { key, flags, reply } => {
                let _ = reply.send(self.ledger.clear_granted(&key, flags));
            }
            Command::ClearGrantedForTarget {
                target,
                flags,
                reply,
            } => {
                let _ = reply.send(self.ledger.clear_granted_for_target(&target, flags));
            }
            Command::ClearAll { flags, reply } => {
                let cleared = self.ledger.clear_all(flags);
                if flags.contains(ClearFlags::SCAN) && self.config.scan_capability.is_some() {
                    self.stop_scanning();
                }
                let _ = reply.send(cleared);
            }
            Command::AddLock { key, holder, reply } => {
                let _ = reply.send(self.ledger.add_lock(&key, &holder));
            }
            Command::RemoveLock { key, holder, reply } => {
                let _ = reply.send(self.ledger.remove_lock(&key, holder));
            }
            Command::IsInRange { key, reply } => {
                let _ = reply.send(self.ledger.is_in_range(&key));
            }
            Command::CanActivate {
                target,
                source,
                reply,
            } => {
                let _ = reply.send(self.ledger.can_activate(&target, source));
            }
            Command::TryActivate {
                target,
                source,
                reply,
            } => {
                let _ = reply.send(self.ledger.try_activate(&target, source));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.ledger.snapshot());
            }
            Command::Status { reply } => {
                let _ = reply.send(self.status());
            }
            Command::Shutdown { reply } => {
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn status(&self) -> ScanStatus {
        ScanStatus {
            paused: self.paused,
            stopped: self.stopped,
            outstanding: self.outstanding.len(),
            waiting: self.wait_until.is_some(),
            cycles: self.cycles,
            presets: self.presets.keys().cloned().collect(),
        }
    }

    /// Requests a cycle unless a wait is already scheduled.
    fn on_request(&mut self) {
        if self.wait_until.is_none() {
            self.request_scan();
        }
    }

    fn request_scan(&mut self) {
        if self.paused || self.stopped || !self.outstanding.is_empty() {
            return;
        }
        if let Err(err) = self.start_cycle() {
            self.wait_after(&err);
        }
    }

    fn start_cycle(&mut self) -> Result<(), ScanError> {
        self.ensure_ledger()?;

        let selection = self.config.scan_source;
        let source = resolve_scan_source(self.agent.as_ref(), selection)
            .ok_or(ScanError::NoScanSource { selection })?;

        let now = Instant::now();
        if let Some(last) = self.last_cycle_at {
            let rate = seconds(self.config.max_scan_rate);
            let ready_at = last + rate;
            if ready_at > now {
                trace!(
                    target: "grasp::scan",
                    remaining_ms = (ready_at - now).as_millis() as u64,
                    "rate limited; waiting"
                );
                self.wait_until = Some(ready_at);
                return Ok(());
            }
        }

        if self.config.update_presets_on_request
            && let Some(presets) = self.agent.presets()
        {
            self.presets = presets;
        }
        if self.presets.is_empty() {
            return Err(ScanError::NoPresets);
        }

        for (category, preset) in &self.presets {
            if !preset.has_work() {
                trace!(target: "grasp::scan", %category, "preset has no query work; skipping");
                continue;
            }
            let request = ScanRequest {
                category: category.clone(),
                preset: preset.clone(),
                source,
            };
            let completions = CompletionSender::new(self.completion_tx.clone());
            match self.engine.start_request(request, completions) {
                Some(handle) => {
                    self.outstanding.insert(handle, category.clone());
                }
                None => trace!(target: "grasp::scan", %category, "engine did not accept query"),
            }
        }

        if self.outstanding.is_empty() {
            return Err(ScanError::NoQueryAccepted {
                presets: self.presets.len(),
            });
        }

        self.last_cycle_at = Some(now);
        self.failsafe_at = Some(now + seconds(self.config.failsafe_delay));
        let categories: Vec<CategoryKey> = self.outstanding.values().cloned().collect();
        trace!(target: "grasp::scan", queries = categories.len(), "scan cycle started");
        self.events
            .publish_scan(ScanEvent::CycleStarted { categories });
        Ok(())
    }

    /// Attaches the agent's registry and runs first-time initialisation.
    fn ensure_ledger(&mut self) -> Result<(), ScanError> {
        if !self.ledger.has_registry() {
            let registry = self
                .agent
                .capability_registry()
                .ok_or(ScanError::RegistryUnavailable)?;
            self.ledger.set_registry(registry);
        }
        if !self.initialized {
            self.ledger.initialize(
                &self.config.persistent,
                self.config.scan_capability.as_ref(),
            )?;
            self.initialized = true;
        }
        Ok(())
    }

    fn reinitialize(&mut self) -> Result<usize, ScanError> {
        let registry = self
            .agent
            .capability_registry()
            .ok_or(ScanError::RegistryUnavailable)?;
        self.ledger.set_registry(registry);
        let granted = self.ledger.initialize(
            &self.config.persistent,
            self.config.scan_capability.as_ref(),
        )?;
        self.initialized = true;
        if self.stopped {
            info!(target: "grasp::scan", "scan capability restored; scanning resumes");
            self.stopped = false;
        }
        self.on_request();
        Ok(granted)
    }

    fn wait_after(&mut self, err: &ScanError) {
        let delay = seconds(self.config.error_wait_delay);
        self.wait_until = Some(Instant::now() + delay);
        self.report(err);
        self.events.publish_scan(ScanEvent::Waiting {
            reason: err.to_string(),
            delay_ms: delay.as_millis() as u64,
        });
    }

    /// Logs `err` at its severity the first time, at debug afterwards.
    fn report(&mut self, err: &ScanError) {
        let code = err.error_code();
        if !self.reported.insert(code) {
            debug!(target: "grasp::scan", code, %err, "scan deferred");
            return;
        }
        let severity = err.severity();
        if severity.is_operator_visible() {
            error!(target: "grasp::scan", code, %severity, %err, "scan deferred");
        } else {
            warn!(target: "grasp::scan", code, %err, "scan deferred");
        }
    }

    fn on_completion(&mut self, completion: QueryCompletion) {
        if self.outstanding.remove(&completion.handle).is_none() {
            trace!(
                target: "grasp::scan",
                handle = completion.handle.0,
                "ignoring completion for a request no longer outstanding"
            );
            return;
        }

        let preset = self.presets.get(&completion.category);
        let radius = preset.map(|p| p.shape.effective_radius());
        let activation = preset.and_then(|p| TargetFilter::activation_source(&p.filters));
        for hit in completion.hits {
            if let Some(source) = activation
                && !self.ledger.can_activate(&hit.target, source)
            {
                trace!(
                    target: "grasp::scan",
                    candidate = %hit.target.id(),
                    category = %completion.category,
                    "dropping hit that cannot be activated"
                );
                continue;
            }
            if let Some(result) = normalize(&completion.category, radius, hit) {
                self.merge_result(result);
            }
        }

        if self.outstanding.is_empty() {
            self.finish_cycle();
        }
    }

    /// Keeps one result per target, at its nearest distance.
    fn merge_result(&mut self, result: ScanResult) {
        match self.cycle_results.iter_mut().find(|r| **r == result) {
            Some(existing) if result.normalized_distance < existing.normalized_distance => {
                *existing = result;
            }
            Some(_) => {}
            None => self.cycle_results.push(result),
        }
    }

    fn finish_cycle(&mut self) {
        self.failsafe_at = None;
        self.cycles += 1;
        self.reported.clear();

        let results = std::mem::take(&mut self.cycle_results);
        self.ledger.reconcile(results);
        let hits: Vec<ScanHit> = self.ledger.results().iter().map(ScanHit::from).collect();
        trace!(target: "grasp::scan", cycle = self.cycles, hits = hits.len(), "scan cycle completed");
        self.events.publish_scan(ScanEvent::CycleCompleted { hits });

        self.request_scan();
    }

    fn on_failsafe(&mut self) {
        let outstanding = self.outstanding.len();
        if outstanding == 0 {
            return;
        }
        self.report(&ScanError::QueryTimeout { outstanding });
        self.events
            .publish_scan(ScanEvent::FailsafeTriggered { outstanding });
        self.end_requests(false);
        self.request_scan();
    }

    /// Removes every outstanding query from the engine. Returns how many were
    /// removed.
    fn end_requests(&mut self, notify: bool) -> usize {
        let ended = self.outstanding.len();
        for handle in std::mem::take(&mut self.outstanding).into_keys() {
            self.engine.remove_request(handle);
        }
        self.cycle_results.clear();
        self.failsafe_at = None;
        if ended > 0 {
            debug!(target: "grasp::scan", ended, "ended outstanding queries");
        }
        if notify {
            self.on_request();
        }
        ended
    }

    fn set_paused(&mut self, paused: bool, end_requests: bool) {
        if paused == self.paused {
            return;
        }
        self.paused = paused;
        if paused {
            self.wait_until = None;
            if end_requests {
                self.end_requests(false);
            }
            info!(target: "grasp::scan", end_requests, "scanning paused");
            self.events.publish_scan(ScanEvent::Paused);
        } else {
            info!(target: "grasp::scan", "scanning resumed");
            self.events.publish_scan(ScanEvent::Resumed);
            self.request_scan();
        }
    }

    fn possession_changed(&mut self) {
        debug!(target: "grasp::scan", "possession changed");
        if self.config.end_requests_on_possession_change {
            self.end_requests(false);
        }
        if self.config.update_presets_on_possession_change
            && let Some(presets) = self.agent.presets()
        {
            self.replace_presets(presets);
        }
        self.on_request();
    }

    /// Swaps the preset map, ending queries whose category went away.
    fn replace_presets(&mut self, presets: BTreeMap<CategoryKey, QueryPreset>) {
        let removed: Vec<RequestHandle> = self
            .outstanding
            .iter()
            .filter(|(_, category)| !presets.contains_key(*category))
            .map(|(handle, _)| *handle)
            .collect();
        for handle in &removed {
            self.outstanding.remove(handle);
            self.engine.remove_request(*handle);
        }
        self.presets = presets;

        if !removed.is_empty() {
            debug!(target: "grasp::scan", ended = removed.len(), "ended queries for removed presets");
            if self.outstanding.is_empty() {
                self.cycle_results.clear();
                self.failsafe_at = None;
            }
        }
    }

    fn stop_scanning(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.wait_until = None;
        self.end_requests(false);
        info!(target: "grasp::scan", "scan capability cleared; scanning stopped until re-initialised");
    }

    fn teardown(&mut self) {
        self.end_requests(false);
        self.wait_until = None;
        self.failsafe_at = None;
    }
}

/// Recomputes the hit's distance from the query origin.
///
/// Engines report the shape radius for overlap hits, so the distance is
/// measured again against the target's current location.
fn normalize(category: &CategoryKey, radius: Option<f32>, hit: OverlapHit) -> Option<ScanResult> {
    let target = hit.target.upgrade()?;
    if target.is_dead() {
        return None;
    }
    let flat = target.parameters().is_some_and(|p| p.grant_distance_2d);
    let radius = radius.unwrap_or(hit.reported_distance);
    let distance = normalized_scan_distance(hit.trace_start, target.location(), radius, flat);
    Some(ScanResult::new(category.clone(), hit.target, distance))
}

/// Converts a configured delay, clamped to [`GraspConfig::MAX_DELAY`].
fn seconds(value: f32) -> Duration {
    if value.is_nan() || value <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f32(value.min(GraspConfig::MAX_DELAY)).unwrap_or(Duration::ZERO)
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_never_exceeds_the_delay_cap() {
        let cap = Duration::from_secs_f32(GraspConfig::MAX_DELAY);
        assert_eq!(seconds(1.0e30), cap);
        assert_eq!(seconds(f32::INFINITY), cap);
        assert!(Instant::now().checked_add(seconds(1.0e30)).is_some());
    }

    #[test]
    fn seconds_treats_invalid_values_as_zero() {
        assert_eq!(seconds(-1.0), Duration::ZERO);
        assert_eq!(seconds(f32::NAN), Duration::ZERO);
        assert_eq!(seconds(0.25), Duration::from_millis(250));
    }
}
