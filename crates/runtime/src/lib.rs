//! Runtime orchestration for the grasp interaction stack.
//!
//! This crate turns the pure queries of `grasp-core` into a running service:
//! a scan worker issues spatial queries for one agent, reconciles the results
//! into capability grants, and reports what changed on an event bus. Consumers
//! embed [`GraspRuntime`] and talk to it through [`GraspHandle`].
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the orchestrator and builder
//! - [`api`] exposes the handle, errors and collaborator contracts
//! - [`ledger`] keeps grants, claimants and locks in step with scan results
//! - [`events`] provides topic-based event bus for flexible event routing
//! - [`hooks`] provides lifecycle hooks around grants and activations
//! - [`memory`] offers in-memory collaborators for tests and local runs
//! - `workers` keeps the scan task internal to the crate
pub mod api;
pub mod events;
pub mod hooks;
pub mod ledger;
pub mod memory;
pub mod runtime;

mod workers;

pub use api::{
    ActivateError, ActivationRequest, AgentProvider, CapabilityRegistry, CapabilitySpec,
    CompletionSender, GraspHandle, OverlapHit, QueryCompletion, RequestHandle, Result,
    RuntimeError, ScanError, ScanRequest, ScanSource, SpatialQueryEngine,
};
pub use events::{Event, EventBus, GrantEvent, RevokeReason, ScanEvent, ScanHit, Topic};
pub use hooks::{ActivationContext, GrantContext, GrantHook, HookRegistry};
pub use ledger::{GrantLedger, GrantRecord, GrantSnapshot, LedgerSnapshot, ReconcileReport};
pub use memory::{DeliveryMode, InMemoryAgent, InMemoryCapabilityRegistry, InMemoryQueryEngine};
pub use runtime::{GraspRuntime, GraspRuntimeBuilder, RuntimeConfig};
pub use workers::ScanStatus;
