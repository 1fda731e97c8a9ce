//! Pure data model and Interaction Query for the grasp interaction stack.
//!
//! An agent scans its surroundings for [`Interactable`] targets, each of which
//! publishes [`InteractionParameters`]. The [`query`] module classifies an
//! agent/target pair as cannot-interact, highlight-only or can-interact; the
//! runtime crate turns scan results into capability grants.
//!
//! This crate performs no I/O and has no async code. Enable the `serde`
//! feature to (de)serialise configuration and parameter types.
pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod grant;
pub mod keys;
pub mod math;
pub mod params;
pub mod query;
pub mod scan;
pub mod target;

pub use config::{GraspConfig, ScanSourceSelection};
pub use context::{InteractorContext, NetMode};
pub use error::{ErrorSeverity, GraspError, ParamsError};
pub use filter::{TargetFilter, admits_all};
pub use grant::{ActivationSource, ClearFlags, GrantHandle};
pub use keys::{CapabilityKey, CategoryKey};
pub use math::Vec3;
pub use params::{FocusMode, InteractionParameters};
pub use query::{
    EffectiveLimits, Gate, InteractionResult, QueryOutcome, RankedCandidate, rank_candidates,
};
pub use scan::{
    LocationSource, QueryPreset, ScanOrigin, ScanResult, ScanShape, normalized_scan_distance,
};
pub use target::{
    Interactable, InteractionPoint, PayloadItem, TargetActor, TargetId, TargetRef,
};
