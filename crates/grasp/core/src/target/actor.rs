use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{Interactable, InteractionPoint, PayloadItem, TargetId};
use crate::math::Vec3;
use crate::params::InteractionParameters;

/// Plain world object implementing [`Interactable`].
///
/// Used by hosts that do not have their own target type, and by tests. The
/// transform can be moved and the target killed through a shared reference.
#[derive(Debug)]
pub struct TargetActor {
    id: TargetId,
    transform: RwLock<(Vec3, Vec3)>,
    parameters: Option<InteractionParameters>,
    points: Vec<InteractionPoint>,
    payload: Vec<PayloadItem>,
    dead: AtomicBool,
}

impl TargetActor {
    pub fn new(id: TargetId, location: Vec3, parameters: InteractionParameters) -> Self {
        Self {
            id,
            transform: RwLock::new((location, Vec3::FORWARD)),
            parameters: Some(parameters),
            points: Vec::new(),
            payload: Vec::new(),
            dead: AtomicBool::new(false),
        }
    }

    /// A target that publishes no parameters at all.
    pub fn without_parameters(id: TargetId, location: Vec3) -> Self {
        Self {
            parameters: None,
            ..Self::new(id, location, InteractionParameters::default())
        }
    }

    pub fn with_forward(self, forward: Vec3) -> Self {
        if let Ok(mut transform) = self.transform.write() {
            transform.1 = forward;
        }
        self
    }

    pub fn with_points(mut self, points: Vec<InteractionPoint>) -> Self {
        self.points = points;
        self
    }

    pub fn with_payload(mut self, payload: Vec<PayloadItem>) -> Self {
        self.payload = payload;
        self
    }

    pub fn set_location(&self, location: Vec3) {
        if let Ok(mut transform) = self.transform.write() {
            transform.0 = location;
        }
    }

    pub fn set_dead(&self, dead: bool) {
        self.dead.store(dead, Ordering::Release);
    }

    fn transform(&self) -> (Vec3, Vec3) {
        self.transform
            .read()
            .map(|t| *t)
            .unwrap_or((Vec3::ZERO, Vec3::FORWARD))
    }
}

impl Interactable for TargetActor {
    fn id(&self) -> TargetId {
        self.id
    }

    fn location(&self) -> Vec3 {
        self.transform().0
    }

    fn forward(&self) -> Vec3 {
        self.transform().1
    }

    fn parameters(&self) -> Option<&InteractionParameters> {
        self.parameters.as_ref()
    }

    fn interaction_points(&self) -> Vec<InteractionPoint> {
        self.points.clone()
    }

    fn is_dead(&self) -> bool {
        self.dead.load(Ordering::Acquire)
    }

    fn payload(&self) -> Vec<PayloadItem> {
        self.payload.clone()
    }
}
