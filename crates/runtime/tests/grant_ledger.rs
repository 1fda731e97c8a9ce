//! End-to-end grant scenarios driven through the scan worker.
mod common;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use common::{door, start, target, wait_grant, wait_scan};
use grasp_core::{
    ActivationSource, CapabilityKey, CategoryKey, ClearFlags, GraspConfig, InteractionParameters,
    PayloadItem, QueryPreset, ScanShape, TargetActor, TargetFilter, TargetId, TargetRef, Vec3,
};
use grasp_runtime::{
    ActivateError, DeliveryMode, GrantEvent, RevokeReason, RuntimeError, ScanEvent, Topic,
};

fn config() -> GraspConfig {
    GraspConfig::new().with_max_scan_rate(0.25)
}

fn open() -> CapabilityKey {
    CapabilityKey::new("ability.open")
}

/// Grant on approach, revoke once the target leaves interact range.
#[tokio::test(start_paused = true)]
async fn capability_follows_target_in_and_out_of_range() {
    let a = door(1, 150.0, "ability.open");
    let h = start(config(), DeliveryMode::Immediate, &[a.clone()]).await;
    let mut grants = h.runtime.subscribe(Topic::Grant);

    let granted = wait_grant(&mut grants, |e| matches!(e, GrantEvent::Granted { .. })).await;
    assert!(matches!(
        granted,
        GrantEvent::Granted { ref key, target: Some(TargetId(1)), persistent: false, .. } if *key == open()
    ));
    assert!(h.handle.is_in_range(open()).await.expect("in range"));

    // highlight-only distance: filtered out of the scan
    a.set_location(Vec3::new(250.0, 0.0, 0.0));
    let revoked = wait_grant(&mut grants, |e| matches!(e, GrantEvent::Revoked { .. })).await;
    assert!(matches!(
        revoked,
        GrantEvent::Revoked {
            reason: RevokeReason::NoClaimants,
            ..
        }
    ));
    assert_eq!(h.registry.live_grants(), 0);
}

/// Threshold 0.7 over a 400-unit sphere: 320 units (0.8) is too far to
/// grant, 260 (0.65) grants, drifting back to 320 keeps it.
#[tokio::test(start_paused = true)]
async fn grant_threshold_has_hysteresis() {
    let params = InteractionParameters {
        max_distance: 380.0,
        max_highlight_distance: 400.0,
        ..InteractionParameters::default().with_capability("ability.open")
    };
    let a = target(1, 320.0, params);
    let config = config().with_preset(
        CategoryKey::interact(),
        QueryPreset::with_shape(ScanShape::Sphere { radius: 400.0 }),
    );
    let h = start(config, DeliveryMode::Immediate, &[a.clone()]).await;
    let mut scan = h.runtime.subscribe(Topic::Scan);
    let mut grants = h.runtime.subscribe(Topic::Grant);

    let far = |e: &ScanEvent| {
        matches!(e, ScanEvent::CycleCompleted { hits } if hits.first().is_some_and(|hit| (hit.normalized_distance - 0.8).abs() < 1.0e-3))
    };
    wait_scan(&mut scan, far).await;
    assert!(h.handle.snapshot().await.expect("snapshot").grants.is_empty());

    a.set_location(Vec3::new(260.0, 0.0, 0.0));
    wait_grant(&mut grants, |e| matches!(e, GrantEvent::Granted { .. })).await;

    a.set_location(Vec3::new(320.0, 0.0, 0.0));
    let mut scan = scan.resubscribe();
    wait_scan(&mut scan, far).await;
    wait_scan(&mut scan, far).await;
    let snapshot = h.handle.snapshot().await.expect("snapshot");
    assert_eq!(snapshot.grants.len(), 1);
    assert_eq!(snapshot.grants[0].claimants, vec![TargetId(1)]);
}

/// A lock keeps the grant through a cycle without the target; releasing it
/// lets the next cycle revoke.
#[tokio::test(start_paused = true)]
async fn lock_holds_grant_until_removed() {
    let a = door(1, 150.0, "ability.open");
    let h = start(config(), DeliveryMode::Immediate, &[a.clone()]).await;
    let mut scan = h.runtime.subscribe(Topic::Scan);
    let mut grants = h.runtime.subscribe(Topic::Grant);

    wait_grant(&mut grants, |e| matches!(e, GrantEvent::Granted { .. })).await;
    assert!(h.handle.add_lock(open(), TargetRef::new(&a)).await.expect("lock"));

    a.set_location(Vec3::new(900.0, 0.0, 0.0));
    let mut scan = scan.resubscribe();
    let empty = |e: &ScanEvent| matches!(e, ScanEvent::CycleCompleted { hits } if hits.is_empty());
    wait_scan(&mut scan, empty).await;
    wait_scan(&mut scan, empty).await;

    let snapshot = h.handle.snapshot().await.expect("snapshot");
    assert_eq!(snapshot.grants.len(), 1);
    assert_eq!(snapshot.grants[0].locks, vec![TargetId(1)]);

    assert!(h.handle.remove_lock(open(), TargetId(1)).await.expect("unlock"));
    wait_grant(&mut grants, |e| {
        matches!(e, GrantEvent::Revoked { reason: RevokeReason::NoClaimants, .. })
    })
    .await;
    assert!(h.handle.snapshot().await.expect("snapshot").grants.is_empty());
}

/// Two targets sharing a capability: it survives the first leaving.
#[tokio::test(start_paused = true)]
async fn shared_capability_is_forfeited_before_revoked() {
    let a = door(1, 100.0, "ability.open");
    let b = door(2, 180.0, "ability.open");
    let h = start(config(), DeliveryMode::Immediate, &[a.clone(), b.clone()]).await;
    let mut grants = h.runtime.subscribe(Topic::Grant);

    wait_grant(&mut grants, |e| matches!(e, GrantEvent::Granted { .. })).await;

    h.engine.remove(TargetId(1));
    drop(a);
    let forfeited = wait_grant(&mut grants, |e| matches!(e, GrantEvent::Forfeited { .. })).await;
    assert!(matches!(
        forfeited,
        GrantEvent::Forfeited {
            target: TargetId(1),
            remaining: 1,
            ..
        }
    ));
    assert_eq!(h.registry.live_grants(), 1);

    b.set_dead(true);
    wait_grant(&mut grants, |e| matches!(e, GrantEvent::Revoked { .. })).await;
    assert_eq!(h.registry.live_grants(), 0);
}

#[tokio::test(start_paused = true)]
async fn activation_sends_payload_through_registry() {
    let chest = Arc::new(
        TargetActor::new(
            TargetId(3),
            Vec3::new(120.0, 0.0, 0.0),
            InteractionParameters::default().with_capability("ability.loot"),
        )
        .with_payload(vec![PayloadItem("gold".into())]),
    );
    let stranger = door(4, 2_000.0, "ability.open");
    let h = start(config(), DeliveryMode::Immediate, &[chest.clone()]).await;
    let mut grants = h.runtime.subscribe(Topic::Grant);

    wait_grant(&mut grants, |e| matches!(e, GrantEvent::Granted { .. })).await;

    let chest_ref = TargetRef::new(&chest);
    assert!(
        h.handle
            .can_activate(chest_ref.clone(), ActivationSource::EventData)
            .await
            .expect("can activate")
    );
    h.handle
        .try_activate(chest_ref, ActivationSource::EventData)
        .await
        .expect("activation should succeed");
    assert_eq!(
        h.registry.activations()[0].payload,
        vec![PayloadItem("gold".into())]
    );

    let refused = h
        .handle
        .try_activate(TargetRef::new(&stranger), ActivationSource::Automatic)
        .await;
    assert!(matches!(
        refused,
        Err(RuntimeError::Activate(ActivateError::NotGranted(_)))
    ));
}

/// Clearing the scan capability stops scanning until re-initialised.
#[tokio::test(start_paused = true)]
async fn clearing_scan_capability_stops_scanning() {
    let config = config()
        .with_scan_capability("ability.scan")
        .with_persistent("ability.crouch");
    let h = start(config, DeliveryMode::Immediate, &[]).await;
    let mut scan = h.runtime.subscribe(Topic::Scan);
    wait_scan(&mut scan, |e| matches!(e, ScanEvent::CycleCompleted { .. })).await;

    assert_eq!(h.handle.clear_all(ClearFlags::SCAN).await.expect("clear"), 1);
    let status = h.handle.status().await.expect("status");
    assert!(status.stopped);

    let started = h.engine.started_count();
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.engine.started_count(), started);
    // the persistent grant was not part of the clear
    assert_eq!(h.registry.granted_keys(), vec![CapabilityKey::new("ability.crouch")]);

    let granted = h.handle.initialize().await.expect("initialize");
    assert_eq!(granted, Ok(1));
    assert!(!h.handle.status().await.expect("status").stopped);
    assert!(h.engine.started_count() > started);
}

#[tokio::test(start_paused = true)]
async fn clear_granted_refuses_while_in_range() {
    let a = door(1, 150.0, "ability.open");
    let h = start(config(), DeliveryMode::Immediate, &[a.clone()]).await;
    let mut grants = h.runtime.subscribe(Topic::Grant);
    wait_grant(&mut grants, |e| matches!(e, GrantEvent::Granted { .. })).await;

    assert!(!h.handle.clear_granted(open(), ClearFlags::empty()).await.expect("clear"));
    assert!(h.handle.clear_granted(open(), ClearFlags::IN_RANGE).await.expect("clear"));

    // still reachable, so the next cycle grants it again
    wait_grant(&mut grants, |e| matches!(e, GrantEvent::Granted { .. })).await;
}

/// A channel filtered on activation only reports targets whose capability
/// is granted and idle.
#[tokio::test(start_paused = true)]
async fn activation_filter_drops_targets_that_cannot_activate() {
    let focus = QueryPreset {
        filters: vec![
            TargetFilter::Graspable,
            TargetFilter::CanActivate {
                source: ActivationSource::EventData,
            },
        ],
        ..QueryPreset::default()
    };
    let config = GraspConfig {
        presets: BTreeMap::from([(CategoryKey::new("grasp.focus"), focus)]),
        ..config()
    }
    .with_persistent("ability.open");
    let granted = door(1, 100.0, "ability.open");
    let ungranted = door(2, 150.0, "ability.loot");
    let h = start(
        config,
        DeliveryMode::Immediate,
        &[granted.clone(), ungranted.clone()],
    )
    .await;
    let mut scan = h.runtime.subscribe(Topic::Scan);

    let ScanEvent::CycleCompleted { hits } =
        wait_scan(&mut scan, |e| matches!(e, ScanEvent::CycleCompleted { .. })).await
    else {
        unreachable!()
    };
    let ids: Vec<TargetId> = hits.iter().map(|hit| hit.target).collect();
    assert_eq!(ids, vec![TargetId(1)]);

    // a capability busy with an activation drops out of the channel
    let snapshot = h.handle.snapshot().await.expect("snapshot");
    let handle = snapshot
        .grants
        .iter()
        .find(|g| g.key == open())
        .map(|g| g.handle)
        .expect("persistent grant");
    h.registry.set_active(handle, true);

    let ScanEvent::CycleCompleted { hits } =
        wait_scan(&mut scan, |e| matches!(e, ScanEvent::CycleCompleted { .. })).await
    else {
        unreachable!()
    };
    assert!(hits.is_empty());
    assert!(!h.registry.granted_keys().contains(&CapabilityKey::new("ability.loot")));
}
