//! Typed payloads carried on each topic.
use grasp_core::{CapabilityKey, CategoryKey, GrantHandle, ScanResult, TargetId};
use serde::{Deserialize, Serialize};

/// Compact, serialisable form of a [`ScanResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanHit {
    pub category: CategoryKey,
    pub target: TargetId,
    pub normalized_distance: f32,
}

impl From<&ScanResult> for ScanHit {
    fn from(result: &ScanResult) -> Self {
        Self {
            category: result.category.clone(),
            target: result.target.id(),
            normalized_distance: result.normalized_distance,
        }
    }
}

/// Scan orchestrator lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Queries issued for a new cycle.
    CycleStarted { categories: Vec<CategoryKey> },
    /// Every query of the cycle finished and the ledger reconciled.
    CycleCompleted { hits: Vec<ScanHit> },
    /// The next cycle was deferred.
    Waiting { reason: String, delay_ms: u64 },
    /// Outstanding queries were force-cleared after the failsafe delay.
    FailsafeTriggered { outstanding: usize },
    Paused,
    Resumed,
}

/// Why a grant went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum RevokeReason {
    /// The last claimant left the scan results or died.
    NoClaimants,
    /// Cleared through a manual operation.
    Cleared,
    /// Replaced while re-initialising.
    Reinitialized,
}

/// Grant ledger bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GrantEvent {
    Granted {
        key: CapabilityKey,
        handle: GrantHandle,
        target: Option<TargetId>,
        persistent: bool,
    },
    ClaimantAdded {
        key: CapabilityKey,
        target: TargetId,
    },
    /// A claimant left but others keep the grant alive.
    Forfeited {
        key: CapabilityKey,
        target: TargetId,
        remaining: usize,
    },
    Revoked {
        key: CapabilityKey,
        handle: GrantHandle,
        reason: RevokeReason,
    },
    LockAdded {
        key: CapabilityKey,
        target: TargetId,
    },
    LockRemoved {
        key: CapabilityKey,
        target: TargetId,
    },
    Activated {
        key: CapabilityKey,
        target: TargetId,
        success: bool,
    },
}
