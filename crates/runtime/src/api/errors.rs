//! Error types surfaced by the grasp runtime.
//!
//! [`RuntimeError`] covers handle/worker plumbing. [`ScanError`] names the
//! reasons a scan cycle waits and retries, and [`ActivateError`] explains a
//! refused activation. None of them is fatal to the worker.
use grasp_core::{CapabilityKey, ErrorSeverity, GraspError, ScanSourceSelection, TargetId};
use thiserror::Error;
use tokio::sync::oneshot;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("scan worker command channel closed")]
    CommandChannelClosed,

    #[error("scan worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("scan worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error("runtime requires {0} to be configured before building")]
    MissingComponent(&'static str),

    #[error("invalid configuration: {field} must be a positive number of seconds no longer than a day, got {value}")]
    InvalidDelay { field: &'static str, value: f32 },

    #[error(transparent)]
    Activate(#[from] ActivateError),
}

/// Why a scan cycle could not be issued or finished. Every variant is
/// recovered by waiting and requesting again.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScanError {
    #[error("no scan source available ({selection} selection)")]
    NoScanSource { selection: ScanSourceSelection },

    #[error("capability registry not available")]
    RegistryUnavailable,

    #[error("no query presets configured")]
    NoPresets,

    #[error("none of {presets} presets accepted a query; presets have no query work")]
    NoQueryAccepted { presets: usize },

    #[error("{outstanding} queries still outstanding after failsafe delay")]
    QueryTimeout { outstanding: usize },
}

impl GraspError for ScanError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NoScanSource { .. } | Self::RegistryUnavailable => ErrorSeverity::Transient,
            Self::NoPresets | Self::NoQueryAccepted { .. } => ErrorSeverity::Configuration,
            Self::QueryTimeout { .. } => ErrorSeverity::Protocol,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NoScanSource { .. } => "no_scan_source",
            Self::RegistryUnavailable => "registry_unavailable",
            Self::NoPresets => "no_presets",
            Self::NoQueryAccepted { .. } => "no_query_accepted",
            Self::QueryTimeout { .. } => "query_timeout",
        }
    }
}

/// Why an activation request was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActivateError {
    #[error("{0} no longer exists")]
    TargetGone(TargetId),

    #[error("{0} grants no capability")]
    NoCapability(TargetId),

    #[error("capability {0} is not granted")]
    NotGranted(CapabilityKey),

    #[error("capability registry not available")]
    RegistryUnavailable,

    #[error("capability {0} refused to activate")]
    Rejected(CapabilityKey),
}

impl GraspError for ActivateError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::TargetGone(_) => ErrorSeverity::InvalidCandidate,
            Self::NoCapability(_) => ErrorSeverity::Configuration,
            Self::NotGranted(_) | Self::RegistryUnavailable | Self::Rejected(_) => {
                ErrorSeverity::Transient
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::TargetGone(_) => "target_gone",
            Self::NoCapability(_) => "no_capability",
            Self::NotGranted(_) => "not_granted",
            Self::RegistryUnavailable => "registry_unavailable",
            Self::Rejected(_) => "rejected",
        }
    }
}
