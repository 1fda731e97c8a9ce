//! Interactable targets and the weak references the ledger keeps to them.
//!
//! Targets are owned by the surrounding world, never by the grasp stack. Every
//! reference held across a scan cycle is a [`TargetRef`]: an id plus a weak
//! pointer that is checked (and pruned) lazily.
mod actor;
mod point;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use crate::math::Vec3;
use crate::params::InteractionParameters;

pub use actor::TargetActor;
pub use point::{InteractionPoint, sort_nearest_first};

/// Stable identity of a target for the lifetime of the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TargetId(pub u64);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target#{}", self.0)
    }
}

/// Opaque data a target hands over when its capability is activated.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct PayloadItem(pub String);

/// Contract every interactable target implements.
pub trait Interactable: Send + Sync {
    fn id(&self) -> TargetId;

    fn location(&self) -> Vec3;

    fn forward(&self) -> Vec3;

    /// `None` marks the target as missing required data; scans skip it.
    fn parameters(&self) -> Option<&InteractionParameters>;

    /// Explicit interaction markers. Empty means "use the target's transform".
    fn interaction_points(&self) -> Vec<InteractionPoint> {
        Vec::new()
    }

    fn is_dead(&self) -> bool {
        false
    }

    fn payload(&self) -> Vec<PayloadItem> {
        Vec::new()
    }

    /// Interaction points with the transform fallback applied.
    fn reachable_points(&self) -> Vec<InteractionPoint> {
        let points = self.interaction_points();
        if points.is_empty() {
            vec![InteractionPoint::new(self.location(), self.forward())]
        } else {
            points
        }
    }
}

/// Weak, identity-compared handle to an interactable target.
#[derive(Clone)]
pub struct TargetRef {
    id: TargetId,
    target: Weak<dyn Interactable>,
}

impl TargetRef {
    pub fn new<T: Interactable + 'static>(target: &Arc<T>) -> Self {
        let dyn_target: Arc<dyn Interactable> = target.clone();
        Self::from_dyn(&dyn_target)
    }

    pub fn from_dyn(target: &Arc<dyn Interactable>) -> Self {
        Self {
            id: target.id(),
            target: Arc::downgrade(target),
        }
    }

    pub fn id(&self) -> TargetId {
        self.id
    }

    pub fn upgrade(&self) -> Option<Arc<dyn Interactable>> {
        self.target.upgrade()
    }

    /// Still referenced by the world and not flagged dead.
    pub fn is_alive(&self) -> bool {
        self.upgrade().is_some_and(|t| !t.is_dead())
    }
}

impl PartialEq for TargetRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TargetRef {}

impl Hash for TargetRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetRef")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_dies_with_target() {
        let target = Arc::new(TargetActor::new(
            TargetId(1),
            Vec3::ZERO,
            InteractionParameters::default(),
        ));
        let handle = TargetRef::new(&target);
        assert!(handle.is_alive());

        target.set_dead(true);
        assert!(!handle.is_alive());
        assert!(handle.upgrade().is_some());

        drop(target);
        assert!(handle.upgrade().is_none());
    }

    #[test]
    fn equality_ignores_liveness() {
        let a = Arc::new(TargetActor::new(
            TargetId(7),
            Vec3::ZERO,
            InteractionParameters::default(),
        ));
        let first = TargetRef::new(&a);
        drop(a);

        let b = Arc::new(TargetActor::new(
            TargetId(7),
            Vec3::new(10.0, 0.0, 0.0),
            InteractionParameters::default(),
        ));
        assert_eq!(first, TargetRef::new(&b));
    }

    #[test]
    fn transform_is_the_fallback_point() {
        let target = TargetActor::new(
            TargetId(2),
            Vec3::new(5.0, 0.0, 0.0),
            InteractionParameters::default(),
        );
        let points = target.reachable_points();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].location, Vec3::new(5.0, 0.0, 0.0));
    }
}
