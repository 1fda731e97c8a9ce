//! Shared harness for runtime integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use grasp_core::{GraspConfig, InteractionParameters, InteractorContext, TargetActor, TargetId, Vec3};
use grasp_runtime::{
    DeliveryMode, Event, GrantEvent, GraspHandle, GraspRuntime, InMemoryAgent,
    InMemoryCapabilityRegistry, InMemoryQueryEngine, ScanEvent,
};
use tokio::sync::broadcast::{self, error::RecvError};

pub struct Harness {
    pub runtime: GraspRuntime,
    pub handle: GraspHandle,
    pub agent: Arc<InMemoryAgent>,
    pub engine: Arc<InMemoryQueryEngine>,
    pub registry: Arc<InMemoryCapabilityRegistry>,
}

/// Builds a runtime for an agent standing at the origin facing +X.
///
/// The worker does not run until the caller first yields, so subscribing
/// right after this returns sees every event.
pub async fn start(
    config: GraspConfig,
    mode: DeliveryMode,
    targets: &[Arc<TargetActor>],
) -> Harness {
    let registry = Arc::new(InMemoryCapabilityRegistry::new());
    let agent = Arc::new(
        InMemoryAgent::with_pawn(InteractorContext::default()).with_registry(registry.clone()),
    );
    start_with(config, mode, targets, agent, registry).await
}

pub async fn start_with(
    config: GraspConfig,
    mode: DeliveryMode,
    targets: &[Arc<TargetActor>],
    agent: Arc<InMemoryAgent>,
    registry: Arc<InMemoryCapabilityRegistry>,
) -> Harness {
    let engine = Arc::new(InMemoryQueryEngine::new(mode));
    for target in targets {
        engine.insert(target.clone());
    }

    let runtime = GraspRuntime::builder()
        .grasp_config(config)
        .agent(agent.clone())
        .engine(engine.clone())
        .build()
        .await
        .expect("runtime should build");
    let handle = runtime.handle();

    Harness {
        runtime,
        handle,
        agent,
        engine,
        registry,
    }
}

pub fn target(id: u64, x: f32, params: InteractionParameters) -> Arc<TargetActor> {
    Arc::new(TargetActor::new(TargetId(id), Vec3::new(x, 0.0, 0.0), params))
}

pub fn door(id: u64, x: f32, capability: &str) -> Arc<TargetActor> {
    target(id, x, InteractionParameters::default().with_capability(capability))
}

async fn next_event(rx: &mut broadcast::Receiver<Event>) -> Event {
    loop {
        match rx.recv().await {
            Ok(event) => return event,
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => panic!("event bus closed"),
        }
    }
}

/// Waits for the next scan event matching `pred`.
pub async fn wait_scan(
    rx: &mut broadcast::Receiver<Event>,
    pred: impl Fn(&ScanEvent) -> bool,
) -> ScanEvent {
    loop {
        if let Event::Scan(event) = next_event(rx).await
            && pred(&event)
        {
            return event;
        }
    }
}

/// Waits for the next grant event matching `pred`.
pub async fn wait_grant(
    rx: &mut broadcast::Receiver<Event>,
    pred: impl Fn(&GrantEvent) -> bool,
) -> GrantEvent {
    loop {
        if let Event::Grant(event) = next_event(rx).await
            && pred(&event)
        {
            return event;
        }
    }
}
