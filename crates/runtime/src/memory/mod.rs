//! In-memory collaborators for tests, demos and local runs.
//!
//! Each type implements one of the traits in [`crate::api`] over plain data
//! guarded by `std::sync` locks. A poisoned lock degrades to "nothing there"
//! instead of panicking the worker.

mod agent;
mod engine;
mod registry;

pub use agent::InMemoryAgent;
pub use engine::{DeliveryMode, InMemoryQueryEngine};
pub use registry::InMemoryCapabilityRegistry;
