//! The walk itself: load content, build the runtime, move the agent.
use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use grasp_content::{ConfigLoader, TableLoader};
use grasp_core::{
    ActivationSource, CapabilityKey, ClearFlags, Interactable, InteractorContext, TargetId,
    TargetRef, Vec3,
};
use grasp_runtime::{
    DeliveryMode, Event, GrantContext, GrantHook, GraspRuntime, InMemoryAgent,
    InMemoryCapabilityRegistry, InMemoryQueryEngine, ScanEvent, Topic,
};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::SimConfig;

/// Steps a lock taken on activation is held for.
const LOCK_STEPS: u32 = 2;

/// Logs grants and clears as the ledger makes them.
struct LogHook;

impl GrantHook for LogHook {
    fn name(&self) -> &'static str {
        "log"
    }

    fn priority(&self) -> i32 {
        50
    }

    fn post_grant(&self, ctx: &GrantContext<'_>) {
        let claimant = ctx.target.map(TargetRef::id);
        info!(key = %ctx.key, handle = %ctx.handle, ?claimant, "granted");
    }

    fn post_grant_persistent(&self, ctx: &GrantContext<'_>) {
        info!(key = %ctx.key, handle = %ctx.handle, "granted persistent");
    }

    fn pre_clear(&self, ctx: &GrantContext<'_>) {
        info!(key = %ctx.key, handle = %ctx.handle, "clearing");
    }
}

struct HeldLock {
    key: CapabilityKey,
    holder: TargetId,
    release_at: u32,
}

pub async fn run(config: &SimConfig) -> Result<()> {
    let grasp = ConfigLoader::load(&config.agent_config)?;
    let table = TableLoader::load(&config.table)?;
    let targets = table.spawn()?;
    info!(
        targets = targets.len(),
        presets = grasp.presets.len(),
        steps = config.steps,
        "scenario loaded"
    );

    let registry = Arc::new(InMemoryCapabilityRegistry::new());
    let agent = Arc::new(
        InMemoryAgent::with_pawn(InteractorContext::local(config.start, Vec3::FORWARD))
            .with_registry(registry.clone()),
    );
    let engine = Arc::new(InMemoryQueryEngine::new(DeliveryMode::Immediate));
    for target in &targets {
        engine.insert(target.clone());
    }

    let runtime = GraspRuntime::builder()
        .grasp_config(grasp)
        .agent(agent.clone())
        .engine(engine)
        .with_hook(Arc::new(LogHook))
        .build()
        .await
        .context("failed to start grasp runtime")?;
    let handle = runtime.handle();
    let printers = [
        spawn_printer(runtime.subscribe(Topic::Scan)),
        spawn_printer(runtime.subscribe(Topic::Grant)),
    ];

    let mut activated = HashSet::new();
    let mut locks: Vec<HeldLock> = Vec::new();

    for step in 0..=config.steps {
        let location = config.start + Vec3::new(config.stride * step as f32, 0.0, 0.0);
        agent.move_to(location);
        tokio::time::sleep(config.step).await;

        let (due, held): (Vec<_>, Vec<_>) = locks.into_iter().partition(|l| l.release_at <= step);
        locks = held;
        for lock in due {
            handle.remove_lock(lock.key, lock.holder).await?;
        }

        for target in &targets {
            let id = target.id();
            if activated.contains(&id) {
                continue;
            }
            let target_ref = TargetRef::new(target);
            if !handle
                .can_activate(target_ref.clone(), ActivationSource::EventData)
                .await?
            {
                continue;
            }
            match handle
                .try_activate(target_ref.clone(), ActivationSource::EventData)
                .await
            {
                Ok(()) => {
                    info!(step, candidate = %id, "activated");
                    activated.insert(id);
                    if let Some(key) = target.parameters().and_then(|p| p.capability.clone())
                        && handle.add_lock(key.clone(), target_ref).await?
                    {
                        locks.push(HeldLock {
                            key,
                            holder: id,
                            release_at: step + LOCK_STEPS,
                        });
                    }
                }
                Err(err) => warn!(step, candidate = %id, %err, "activation refused"),
            }
        }
    }

    let cleared = handle
        .clear_all(ClearFlags::IN_RANGE | ClearFlags::LOCKED)
        .await?;
    info!(cleared, "cleared remaining scan-driven grants");

    let snapshot = handle.snapshot().await?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    drop(handle);
    runtime.shutdown().await?;
    for printer in printers {
        printer.abort();
    }
    Ok(())
}

/// Prints every event except cycle starts as one JSON line.
fn spawn_printer(mut rx: broadcast::Receiver<Event>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(Event::Scan(ScanEvent::CycleStarted { .. })) => {}
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => println!("{line}"),
                    Err(err) => warn!(%err, "failed to encode event"),
                },
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "event printer lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}
