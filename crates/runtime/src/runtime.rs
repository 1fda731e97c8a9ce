//! High-level runtime orchestrator.
//!
//! The runtime owns the scan worker, wires up command/event channels, and
//! exposes a builder-based API for embedding one agent's grasp stack.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::debug;

use grasp_core::GraspConfig;

use crate::api::{AgentProvider, GraspHandle, Result, RuntimeError, SpatialQueryEngine};
use crate::events::{Event, EventBus, Topic};
use crate::hooks::{GrantHook, HookRegistry};
use crate::ledger::GrantLedger;
use crate::workers::{Command, ScanWorker};

/// Runtime configuration shared across the orchestrator and workers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub grasp: GraspConfig,
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            grasp: GraspConfig::default(),
            event_buffer_size: 100,
            command_buffer_size: 32,
        }
    }
}

/// One agent's grasp stack: a scan worker plus the handle that drives it.
///
/// [`GraspHandle`] provides a cloneable façade for clients.
pub struct GraspRuntime {
    handle: GraspHandle,
    worker_handle: JoinHandle<()>,
}

impl GraspRuntime {
    /// Create a new runtime builder
    pub fn builder() -> GraspRuntimeBuilder {
        GraspRuntimeBuilder::new()
    }

    /// Get a cloneable handle to this runtime
    pub fn handle(&self) -> GraspHandle {
        self.handle.clone()
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.handle.subscribe(topic)
    }

    /// Stops the worker, cancelling outstanding queries, and waits for it.
    pub async fn shutdown(self) -> Result<()> {
        if let Err(err) = self.handle.shutdown().await {
            debug!(target: "grasp::scan", %err, "worker already gone at shutdown");
        }
        drop(self.handle);

        self.worker_handle.await.map_err(RuntimeError::WorkerJoin)
    }
}

/// Builder for [`GraspRuntime`].
pub struct GraspRuntimeBuilder {
    config: RuntimeConfig,
    agent: Option<Arc<dyn AgentProvider>>,
    engine: Option<Arc<dyn SpatialQueryEngine>>,
    hooks: Vec<Arc<dyn GrantHook>>,
}

impl GraspRuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            agent: None,
            engine: None,
            hooks: Vec::new(),
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the agent-level grasp configuration
    pub fn grasp_config(mut self, grasp: GraspConfig) -> Self {
        self.config.grasp = grasp;
        self
    }

    /// Set the agent being scanned for (required)
    pub fn agent(mut self, agent: Arc<dyn AgentProvider>) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Set the spatial query engine (required)
    pub fn engine(mut self, engine: Arc<dyn SpatialQueryEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Adds a ledger hook. Hooks run in priority order regardless of the
    /// order they are added in.
    pub fn with_hook(mut self, hook: Arc<dyn GrantHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Build the runtime and spawn its worker
    pub async fn build(self) -> Result<GraspRuntime> {
        let agent = self.agent.ok_or(RuntimeError::MissingComponent("an agent"))?;
        let engine = self
            .engine
            .ok_or(RuntimeError::MissingComponent("a spatial query engine"))?;
        validate_delays(&self.config.grasp)?;

        let (command_tx, command_rx) = mpsc::channel::<Command>(self.config.command_buffer_size);
        let event_bus = EventBus::with_capacity(self.config.event_buffer_size);
        let handle = GraspHandle::new(command_tx, event_bus.clone());

        let ledger = GrantLedger::new(HookRegistry::new(self.hooks), event_bus.clone());
        let worker = ScanWorker::new(
            self.config.grasp,
            agent,
            engine,
            ledger,
            event_bus,
            command_rx,
        );

        let worker_handle = tokio::spawn(async move {
            worker.run().await;
        });

        Ok(GraspRuntime {
            handle,
            worker_handle,
        })
    }
}

fn validate_delays(config: &GraspConfig) -> Result<()> {
    for (field, value, allow_zero) in [
        ("max_scan_rate", config.max_scan_rate, true),
        ("error_wait_delay", config.error_wait_delay, false),
        ("failsafe_delay", config.failsafe_delay, false),
    ] {
        let valid = value.is_finite()
            && value <= GraspConfig::MAX_DELAY
            && (value > 0.0 || (allow_zero && value == 0.0));
        if !valid {
            return Err(RuntimeError::InvalidDelay { field, value });
        }
    }
    Ok(())
}
