//! Interaction Query: classify an agent/target pair as cannot-interact,
//! highlight-only or can-interact.
//!
//! Everything here is a pure function of its inputs. The evaluation order is
//! validity, distance (with highlight fallback), angle, height; the first
//! failing gate decides the outcome.
mod evaluate;
mod gates;
mod rank;

pub use evaluate::{
    evaluate, evaluate_angle, evaluate_height, evaluate_points, evaluate_range, evaluate_target,
};
pub use gates::{angle_to, within_angle, within_distance, within_facing, within_height};
pub use rank::{RankedCandidate, rank_candidates};

use crate::context::InteractorContext;
use crate::params::InteractionParameters;

/// Classification of an agent/target pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InteractionResult {
    #[default]
    None,
    Highlight,
    Interact,
}

/// The check that turned an evaluation into [`InteractionResult::None`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Gate {
    /// Target gone, dead, or missing parameters.
    Invalid,
    Distance,
    Angle,
    Height,
}

/// Result of an evaluation plus the normalised metrics computed on the way.
///
/// Metrics that were never reached stay at zero.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QueryOutcome {
    pub result: InteractionResult,
    pub normalized_angle: f32,
    pub normalized_distance: f32,
    pub normalized_highlight_distance: f32,
    pub rejected_by: Option<Gate>,
}

impl QueryOutcome {
    pub fn rejected(gate: Gate) -> Self {
        Self {
            rejected_by: Some(gate),
            ..Self::default()
        }
    }

    pub fn is_none(&self) -> bool {
        self.result == InteractionResult::None
    }

    pub fn can_interact(&self) -> bool {
        self.result == InteractionResult::Interact
    }
}

/// Limits after authority tolerance has been applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EffectiveLimits {
    pub angle: f32,
    pub distance: f32,
    /// Zero when highlighting is disabled.
    pub highlight_distance: f32,
    pub height_above: f32,
    pub height_below: f32,
}

impl EffectiveLimits {
    /// The distance scalar also widens highlight distance and both height
    /// limits.
    pub fn resolve(params: &InteractionParameters, ctx: &InteractorContext) -> Self {
        let (angle_scale, distance_scale) = if ctx.applies_tolerance() {
            (
                params.angle_tolerance_scalar(),
                params.distance_tolerance_scalar(),
            )
        } else {
            (1.0, 1.0)
        };

        let highlight_distance = if params.is_highlight_enabled() {
            params.max_highlight_distance * distance_scale
        } else {
            0.0
        };

        Self {
            angle: params.max_angle * angle_scale,
            distance: params.max_distance * distance_scale,
            highlight_distance,
            height_above: params.max_height_above * distance_scale,
            height_below: params.max_height_below * distance_scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NetMode;
    use crate::math::Vec3;

    #[test]
    fn tolerance_widens_every_limit() {
        let params = InteractionParameters::default();
        let server =
            InteractorContext::networked(Vec3::ZERO, Vec3::FORWARD, true, NetMode::DedicatedServer);
        let limits = EffectiveLimits::resolve(&params, &server);

        assert!((limits.distance - 220.0).abs() < 1.0e-3);
        assert!((limits.highlight_distance - 440.0).abs() < 1.0e-3);
        assert!((limits.height_above - 33.0).abs() < 1.0e-3);
        assert!((limits.angle - 396.0).abs() < 1.0e-3);
    }

    #[test]
    fn local_limits_are_untouched() {
        let params = InteractionParameters {
            max_highlight_distance: 0.0,
            ..Default::default()
        };
        let limits = EffectiveLimits::resolve(&params, &InteractorContext::default());
        assert_eq!(limits.distance, 200.0);
        assert_eq!(limits.highlight_distance, 0.0);
    }
}
