use super::gates::{angle_to, within_angle, within_distance, within_height};
use super::{EffectiveLimits, Gate, InteractionResult, QueryOutcome};
use crate::context::InteractorContext;
use crate::keys::CategoryKey;
use crate::math::{SMALL_NUMBER, Vec3};
use crate::params::InteractionParameters;
use crate::target::{Interactable, InteractionPoint, sort_nearest_first};

fn normalize(value: f32, limit: f32) -> f32 {
    if limit <= SMALL_NUMBER {
        return 0.0;
    }
    (value / limit).clamp(0.0, 1.0)
}

/// Distance gate with highlight fallback.
///
/// `Err` carries the final outcome (highlight or too far); `Ok` carries the
/// normalised distance for a target inside interaction range.
fn distance_stage(
    ctx: &InteractorContext,
    location: Vec3,
    params: &InteractionParameters,
    limits: &EffectiveLimits,
) -> Result<f32, QueryOutcome> {
    let flat = params.distance_2d;
    let distance = ctx.location.dist_by(location, flat);

    if within_distance(ctx.location, location, limits.distance, flat) {
        return Ok(normalize(distance, limits.distance));
    }

    if limits.highlight_distance > 0.0
        && within_distance(ctx.location, location, limits.highlight_distance, flat)
    {
        return Err(QueryOutcome {
            result: InteractionResult::Highlight,
            normalized_highlight_distance: normalize(distance, limits.highlight_distance),
            ..QueryOutcome::default()
        });
    }

    Err(QueryOutcome::rejected(Gate::Distance))
}

fn normalized_angle(ctx: &InteractorContext, location: Vec3, forward: Vec3, degrees: f32) -> f32 {
    angle_to(ctx.location, location, forward)
        .map(|angle| normalize(angle, (degrees * 0.5).to_radians()))
        .unwrap_or(0.0)
}

/// Full evaluation of a single interaction point.
///
/// Sorting candidates nearest-first lets callers stop at the first outcome
/// rejected by [`Gate::Distance`]: every later candidate is farther.
pub fn evaluate(
    ctx: &InteractorContext,
    location: Vec3,
    forward: Vec3,
    params: &InteractionParameters,
) -> QueryOutcome {
    let limits = EffectiveLimits::resolve(params, ctx);

    let normalized_distance = match distance_stage(ctx, location, params, &limits) {
        Ok(normalized) => normalized,
        Err(outcome) => return outcome,
    };

    if !within_angle(ctx.location, location, forward, limits.angle) {
        return QueryOutcome {
            normalized_distance,
            ..QueryOutcome::rejected(Gate::Angle)
        };
    }
    let normalized_angle = normalized_angle(ctx, location, forward, limits.angle);

    if !within_height(
        ctx.location,
        location,
        limits.height_above,
        limits.height_below,
    ) {
        return QueryOutcome {
            normalized_distance,
            normalized_angle,
            ..QueryOutcome::rejected(Gate::Height)
        };
    }

    QueryOutcome {
        result: InteractionResult::Interact,
        normalized_angle,
        normalized_distance,
        normalized_highlight_distance: 0.0,
        rejected_by: None,
    }
}

/// Evaluates a target at its own transform.
pub fn evaluate_target(ctx: &InteractorContext, target: &dyn Interactable) -> QueryOutcome {
    if target.is_dead() {
        return QueryOutcome::rejected(Gate::Invalid);
    }
    match target.parameters() {
        Some(params) => evaluate(ctx, target.location(), target.forward(), params),
        None => QueryOutcome::rejected(Gate::Invalid),
    }
}

/// Evaluates a target's interaction points nearest-first and returns the
/// first outcome that is not `None`, with the point that produced it.
///
/// `category` restricts evaluation to points serving that channel.
pub fn evaluate_points(
    ctx: &InteractorContext,
    target: &dyn Interactable,
    category: Option<&CategoryKey>,
) -> (QueryOutcome, Option<InteractionPoint>) {
    if target.is_dead() {
        return (QueryOutcome::rejected(Gate::Invalid), None);
    }
    let Some(params) = target.parameters() else {
        return (QueryOutcome::rejected(Gate::Invalid), None);
    };

    let mut points: Vec<InteractionPoint> = target
        .reachable_points()
        .into_iter()
        .filter(|point| category.is_none_or(|c| point.serves(c)))
        .collect();
    sort_nearest_first(&mut points, ctx.location, params.distance_2d);

    let mut last = QueryOutcome::rejected(Gate::Invalid);
    for point in points {
        let outcome = evaluate(ctx, point.location, point.forward, params);
        if !outcome.is_none() {
            return (outcome, Some(point));
        }
        last = outcome;
    }
    (last, None)
}

/// Distance-only evaluation (highlight fallback included).
pub fn evaluate_range(
    ctx: &InteractorContext,
    location: Vec3,
    params: &InteractionParameters,
) -> QueryOutcome {
    let limits = EffectiveLimits::resolve(params, ctx);
    match distance_stage(ctx, location, params, &limits) {
        Ok(normalized_distance) => QueryOutcome {
            result: InteractionResult::Interact,
            normalized_distance,
            ..QueryOutcome::default()
        },
        Err(outcome) => outcome,
    }
}

/// Angle-only evaluation.
pub fn evaluate_angle(
    ctx: &InteractorContext,
    location: Vec3,
    forward: Vec3,
    params: &InteractionParameters,
) -> QueryOutcome {
    let limits = EffectiveLimits::resolve(params, ctx);
    if !within_angle(ctx.location, location, forward, limits.angle) {
        return QueryOutcome::rejected(Gate::Angle);
    }
    QueryOutcome {
        result: InteractionResult::Interact,
        normalized_angle: normalized_angle(ctx, location, forward, limits.angle),
        ..QueryOutcome::default()
    }
}

/// Height-only evaluation.
pub fn evaluate_height(
    ctx: &InteractorContext,
    location: Vec3,
    params: &InteractionParameters,
) -> QueryOutcome {
    let limits = EffectiveLimits::resolve(params, ctx);
    if within_height(
        ctx.location,
        location,
        limits.height_above,
        limits.height_below,
    ) {
        QueryOutcome {
            result: InteractionResult::Interact,
            ..QueryOutcome::default()
        }
    } else {
        QueryOutcome::rejected(Gate::Height)
    }
}
