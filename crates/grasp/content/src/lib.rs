//! Data-driven grasp content: agent configuration and interaction tables.
//!
//! - Agent configuration ([`GraspConfig`](grasp_core::GraspConfig)) from TOML
//! - Interaction tables (parameter profiles plus placed targets) from RON
//!
//! Every loaded value is validated before it is handed out, so the runtime
//! never sees parameters that break the query's invariants.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{ConfigLoader, InteractionTable, TableLoader, TargetSpec};
