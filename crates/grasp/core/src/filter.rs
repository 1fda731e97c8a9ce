//! Target filters a query preset runs on every overlap hit.
//!
//! The spatial engine applies these after its overlap test; they call back
//! into the Interaction Query.
use crate::context::InteractorContext;
use crate::grant::ActivationSource;
use crate::keys::CategoryKey;
use crate::query::{self, InteractionResult};
use crate::target::Interactable;

#[cfg(feature = "serde")]
fn default_threshold() -> InteractionResult {
    InteractionResult::Interact
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind"))]
pub enum TargetFilter {
    /// Alive and publishing interaction parameters.
    Graspable,
    /// Full evaluation at the target's interaction points.
    WithinData {
        #[cfg_attr(feature = "serde", serde(default = "default_threshold"))]
        threshold: InteractionResult,
    },
    /// Distance (and highlight distance) only.
    WithinRange {
        #[cfg_attr(feature = "serde", serde(default = "default_threshold"))]
        threshold: InteractionResult,
    },
    WithinAngle,
    WithinHeight,
    /// Capability can be activated through `source` right now.
    ///
    /// Only the grant holder knows that, so [`TargetFilter::admits`] checks
    /// that the target publishes a capability and the runtime finishes the
    /// check when the query completes.
    CanActivate {
        #[cfg_attr(feature = "serde", serde(default))]
        source: ActivationSource,
    },
}

impl TargetFilter {
    /// Filter chain used by presets that do not configure their own.
    pub fn standard() -> Vec<Self> {
        vec![
            Self::Graspable,
            Self::WithinData {
                threshold: InteractionResult::Interact,
            },
        ]
    }

    /// The first activation check in `filters`, if the chain has one.
    pub fn activation_source(filters: &[Self]) -> Option<ActivationSource> {
        filters.iter().find_map(|filter| match filter {
            Self::CanActivate { source } => Some(*source),
            _ => None,
        })
    }

    /// Whether `target` passes this filter for an agent at `ctx`.
    pub fn admits(
        &self,
        ctx: &InteractorContext,
        target: &dyn Interactable,
        category: &CategoryKey,
    ) -> bool {
        if let Self::Graspable = self {
            return !target.is_dead() && target.parameters().is_some();
        }
        let Some(params) = target.parameters() else {
            return false;
        };

        match *self {
            Self::Graspable => true,
            Self::WithinData { threshold } => {
                let (outcome, _) = query::evaluate_points(ctx, target, Some(category));
                meets(outcome.result, threshold)
            }
            Self::WithinRange { threshold } => {
                let outcome = query::evaluate_range(ctx, target.location(), params);
                meets(outcome.result, threshold)
            }
            Self::WithinAngle => {
                query::evaluate_angle(ctx, target.location(), target.forward(), params).can_interact()
            }
            Self::WithinHeight => {
                query::evaluate_height(ctx, target.location(), params).can_interact()
            }
            Self::CanActivate { .. } => !target.is_dead() && params.capability.is_some(),
        }
    }
}

/// `Interact` always passes; `Highlight` passes only with a highlight threshold.
fn meets(result: InteractionResult, threshold: InteractionResult) -> bool {
    match result {
        InteractionResult::Interact => true,
        InteractionResult::Highlight => threshold == InteractionResult::Highlight,
        InteractionResult::None => false,
    }
}

/// Runs every filter in order; an empty chain admits everything.
pub fn admits_all(
    filters: &[TargetFilter],
    ctx: &InteractorContext,
    target: &dyn Interactable,
    category: &CategoryKey,
) -> bool {
    filters
        .iter()
        .all(|filter| filter.admits(ctx, target, category))
}
