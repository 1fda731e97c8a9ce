//! Single-condition checks the evaluators are assembled from.
use crate::context::InteractorContext;
use crate::math::Vec3;

/// `from` and `to` are at most `limit` apart.
pub fn within_distance(from: Vec3, to: Vec3, limit: f32, flat: bool) -> bool {
    let limit = limit.max(0.0);
    let delta = to - from;
    let dist_sq = if flat {
        delta.length_squared_2d()
    } else {
        delta.length_squared()
    };
    dist_sq <= limit * limit
}

/// Ground-plane angle, in radians, between the `from → to` direction and
/// `forward`. `None` when either direction is degenerate.
pub fn angle_to(from: Vec3, to: Vec3, forward: Vec3) -> Option<f32> {
    let dir = (to - from).safe_normal_2d();
    let facing = forward.safe_normal_2d();
    if dir.is_nearly_zero() || facing.is_nearly_zero() {
        return None;
    }
    Some(dir.dot(facing).clamp(-1.0, 1.0).acos())
}

/// `to` lies inside the full cone of `degrees` around `forward`, seen from
/// `from`. A cone of 360 degrees or more admits everything.
pub fn within_angle(from: Vec3, to: Vec3, forward: Vec3, degrees: f32) -> bool {
    if degrees >= 360.0 {
        return true;
    }
    match angle_to(from, to, forward) {
        Some(angle) => angle <= (degrees * 0.5).to_radians(),
        None => true,
    }
}

/// Height of `target` relative to `agent` lies in `[-below, +above]`.
pub fn within_height(agent: Vec3, target: Vec3, above: f32, below: f32) -> bool {
    let height = target.z - agent.z;
    height >= -below && height <= above
}

/// `target` lies inside the agent's own forward cone.
pub fn within_facing(ctx: &InteractorContext, target: Vec3, degrees: f32) -> bool {
    within_angle(ctx.location, target, ctx.forward, degrees)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_gate_is_inclusive() {
        let a = Vec3::ZERO;
        assert!(within_distance(a, Vec3::new(200.0, 0.0, 0.0), 200.0, false));
        assert!(!within_distance(a, Vec3::new(200.5, 0.0, 0.0), 200.0, false));
        assert!(within_distance(a, Vec3::new(0.0, 150.0, 500.0), 200.0, true));
    }

    #[test]
    fn cone_uses_half_angle() {
        let forward = Vec3::FORWARD;
        // 45 degrees off-axis.
        let to = Vec3::new(100.0, 100.0, 0.0);
        assert!(within_angle(Vec3::ZERO, to, forward, 90.0));
        assert!(!within_angle(Vec3::ZERO, to, forward, 80.0));
    }

    #[test]
    fn full_circle_admits_behind() {
        let behind = Vec3::new(-100.0, 0.0, 0.0);
        assert!(within_angle(Vec3::ZERO, behind, Vec3::FORWARD, 360.0));
        assert!(!within_angle(Vec3::ZERO, behind, Vec3::FORWARD, 359.0));
    }

    #[test]
    fn coincident_points_pass_the_angle_gate() {
        assert!(within_angle(Vec3::ZERO, Vec3::ZERO, Vec3::FORWARD, 10.0));
        assert_eq!(angle_to(Vec3::ZERO, Vec3::ZERO, Vec3::FORWARD), None);
    }

    #[test]
    fn height_window_is_asymmetric() {
        let agent = Vec3::ZERO;
        assert!(within_height(agent, Vec3::new(0.0, 0.0, 30.0), 30.0, 10.0));
        assert!(!within_height(agent, Vec3::new(0.0, 0.0, -20.0), 30.0, 10.0));
        assert!(within_height(agent, Vec3::new(0.0, 0.0, -10.0), 30.0, 10.0));
    }

    #[test]
    fn facing_uses_agent_forward() {
        let ctx = InteractorContext::local(Vec3::ZERO, Vec3::FORWARD);
        assert!(within_facing(&ctx, Vec3::new(100.0, 10.0, 0.0), 60.0));
        assert!(!within_facing(&ctx, Vec3::new(-100.0, 0.0, 0.0), 60.0));
    }
}
