//! Public runtime API surface.
//!
//! This module gathers the types exposed to consumers of the runtime crate:
//! the handle, the error types, and the collaborator contracts the runtime is
//! built from.

pub mod errors;
pub mod handle;
pub mod providers;

pub use errors::{ActivateError, Result, RuntimeError, ScanError};
pub use handle::GraspHandle;
pub use providers::{
    ActivationRequest, AgentProvider, CapabilityRegistry, CapabilitySpec, CompletionSender,
    OverlapHit, QueryCompletion, RequestHandle, ScanRequest, ScanSource, SpatialQueryEngine,
    resolve_scan_source,
};
