//! Cloneable façade for issuing commands to the scan worker.
//!
//! [`GraspHandle`] hides channel plumbing and offers async helpers for
//! pausing, clearing, locking and activating, plus event subscriptions.
use std::collections::{BTreeMap, HashMap};

use tokio::sync::{broadcast, mpsc, oneshot};

use grasp_core::{
    ActivationSource, CapabilityKey, CategoryKey, ClearFlags, QueryPreset, TargetId, TargetRef,
};

use super::errors::{Result, RuntimeError, ScanError};
use crate::events::{Event, EventBus, Topic};
use crate::ledger::LedgerSnapshot;
use crate::workers::{Command, ScanStatus};

/// Client-facing handle to one agent's grasp runtime.
#[derive(Clone)]
pub struct GraspHandle {
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
}

impl GraspHandle {
    pub(crate) fn new(command_tx: mpsc::Sender<Command>, event_bus: EventBus) -> Self {
        Self {
            command_tx,
            event_bus,
        }
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Pause or resume scanning. With `end_requests`, pausing also cancels
    /// the queries in flight; otherwise their results are still reconciled.
    pub async fn set_paused(&self, paused: bool, end_requests: bool) -> Result<()> {
        self.request(|reply| Command::SetPaused {
            paused,
            end_requests,
            reply,
        })
        .await
    }

    /// Cancel outstanding queries. With `notify`, a new cycle is requested
    /// right away. Returns how many queries were cancelled.
    pub async fn end_requests(&self, notify: bool) -> Result<usize> {
        self.request(|reply| Command::EndRequests { notify, reply })
            .await
    }

    /// Ask for a scan cycle. Ignored while one is in flight or a wait is
    /// pending.
    pub async fn request_scan(&self) -> Result<()> {
        self.request(|reply| Command::RequestScan { reply }).await
    }

    pub async fn possession_changed(&self) -> Result<()> {
        self.request(|reply| Command::PossessionChanged { reply })
            .await
    }

    pub async fn replace_presets(&self, presets: BTreeMap<CategoryKey, QueryPreset>) -> Result<()> {
        self.request(|reply| Command::ReplacePresets { presets, reply })
            .await
    }

    /// Grant persistent and scan capabilities again; also restarts scanning
    /// stopped by clearing the scan capability.
    pub async fn initialize(&self) -> Result<std::result::Result<usize, ScanError>> {
        self.request(|reply| Command::Initialize { reply }).await
    }

    pub async fn clear_granted(&self, key: CapabilityKey, flags: ClearFlags) -> Result<bool> {
        self.request(|reply| Command::ClearGranted { key, flags, reply })
            .await
    }

    pub async fn clear_granted_for_target(
        &self,
        target: TargetRef,
        flags: ClearFlags,
    ) -> Result<usize> {
        self.request(|reply| Command::ClearGrantedForTarget {
            target,
            flags,
            reply,
        })
        .await
    }

    pub async fn clear_all(&self, flags: ClearFlags) -> Result<usize> {
        self.request(|reply| Command::ClearAll { flags, reply })
            .await
    }

    /// Pin `key` open while `holder` is using it.
    pub async fn add_lock(&self, key: CapabilityKey, holder: TargetRef) -> Result<bool> {
        self.request(|reply| Command::AddLock { key, holder, reply })
            .await
    }

    pub async fn remove_lock(&self, key: CapabilityKey, holder: TargetId) -> Result<bool> {
        self.request(|reply| Command::RemoveLock { key, holder, reply })
            .await
    }

    pub async fn is_in_range(&self, key: CapabilityKey) -> Result<bool> {
        self.request(|reply| Command::IsInRange { key, reply })
            .await
    }

    pub async fn can_activate(&self, target: TargetRef, source: ActivationSource) -> Result<bool> {
        self.request(|reply| Command::CanActivate {
            target,
            source,
            reply,
        })
        .await
    }

    /// Activate the capability `target` publishes.
    pub async fn try_activate(&self, target: TargetRef, source: ActivationSource) -> Result<()> {
        self.request(|reply| Command::TryActivate {
            target,
            source,
            reply,
        })
        .await?
        .map_err(RuntimeError::from)
    }

    pub async fn snapshot(&self) -> Result<LedgerSnapshot> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn status(&self) -> Result<ScanStatus> {
        self.request(|reply| Command::Status { reply }).await
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Scan` - Cycle completion, waits and failsafe resets
    /// - `Topic::Grant` - Grants, revocations, locks and activations
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Subscribe to multiple topics at once
    pub fn subscribe_multiple(&self, topics: &[Topic]) -> HashMap<Topic, broadcast::Receiver<Event>> {
        self.event_bus.subscribe_multiple(topics)
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub(crate) async fn shutdown(&self) -> Result<()> {
        self.request(|reply| Command::Shutdown { reply }).await
    }
}
