use std::sync::Arc;

use super::{Gate, QueryOutcome, evaluate_points};
use crate::context::InteractorContext;
use crate::keys::CategoryKey;
use crate::target::{Interactable, InteractionPoint, TargetRef};

/// A candidate that survived ranking, with the point it is reached through.
#[derive(Clone, Debug)]
pub struct RankedCandidate {
    pub target: TargetRef,
    pub outcome: QueryOutcome,
    pub point: Option<InteractionPoint>,
}

/// Sorts candidates nearest-first and evaluates them in order.
///
/// Evaluation stops at the first candidate rejected by the distance gate,
/// since every candidate after it is farther. Candidates rejected by any
/// other gate are skipped. The returned list keeps distance order.
pub fn rank_candidates(
    ctx: &InteractorContext,
    candidates: &[Arc<dyn Interactable>],
    category: Option<&CategoryKey>,
) -> Vec<RankedCandidate> {
    let mut ordered: Vec<(f32, &Arc<dyn Interactable>)> = candidates
        .iter()
        .map(|candidate| (nearest_point_distance(ctx, candidate.as_ref(), category), candidate))
        .collect();
    ordered.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut ranked = Vec::new();
    for (_, candidate) in ordered {
        let (outcome, point) = evaluate_points(ctx, candidate.as_ref(), category);
        match outcome.rejected_by {
            Some(Gate::Distance) => break,
            Some(_) => continue,
            None => ranked.push(RankedCandidate {
                target: TargetRef::from_dyn(candidate),
                outcome,
                point,
            }),
        }
    }
    ranked
}

/// Distance to the nearest point evaluation will consider. Candidates with no
/// such point sort last.
fn nearest_point_distance(
    ctx: &InteractorContext,
    candidate: &dyn Interactable,
    category: Option<&CategoryKey>,
) -> f32 {
    let flat = candidate.parameters().is_some_and(|p| p.distance_2d);
    candidate
        .reachable_points()
        .iter()
        .filter(|point| category.is_none_or(|c| point.serves(c)))
        .map(|point| ctx.location.dist_by(point.location, flat))
        .min_by(f32::total_cmp)
        .unwrap_or(f32::INFINITY)
}
