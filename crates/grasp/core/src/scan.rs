//! Scan shapes, query presets and the per-cycle scan result.
use crate::context::InteractorContext;
use crate::filter::TargetFilter;
use crate::keys::CategoryKey;
use crate::math::{SMALL_NUMBER, Vec3};
use crate::target::TargetRef;

/// Overlap volume of a query preset, centred on the scan origin and rotated
/// by the agent's yaw.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind"))]
pub enum ScanShape {
    Box { half_extent: Vec3 },
    /// Upright cylinder; radius is `half_extent.x`, half height `half_extent.z`.
    Cylinder { half_extent: Vec3 },
    Sphere { radius: f32 },
    /// Upright capsule; `half_height` includes the end caps.
    Capsule { radius: f32, half_height: f32 },
}

impl Default for ScanShape {
    fn default() -> Self {
        Self::Sphere { radius: 400.0 }
    }
}

impl ScanShape {
    /// Radius that scan distances are normalised against.
    pub fn effective_radius(&self) -> f32 {
        match *self {
            Self::Box { half_extent } | Self::Cylinder { half_extent } => {
                0.5 * (half_extent.x + half_extent.y)
            }
            Self::Sphere { radius } => radius,
            Self::Capsule {
                radius,
                half_height,
            } => 0.5 * (radius + half_height),
        }
    }

    /// Whether `point` lies inside the shape placed at `origin` with `yaw`.
    pub fn contains(&self, origin: Vec3, yaw: f32, point: Vec3) -> bool {
        let local = (point - origin).rotate_yaw(-yaw);
        match *self {
            Self::Box { half_extent } => in_box(local, half_extent),
            Self::Cylinder { half_extent } => {
                in_box(local, half_extent) && local.length_squared_2d() <= half_extent.x * half_extent.x
            }
            Self::Sphere { radius } => local.length_squared() <= radius * radius,
            Self::Capsule {
                radius,
                half_height,
            } => {
                let segment = (half_height - radius).max(0.0);
                let nearest_z = local.z.clamp(-segment, segment);
                let offset = Vec3::new(local.x, local.y, local.z - nearest_z);
                offset.length_squared() <= radius * radius
            }
        }
    }
}

fn in_box(local: Vec3, half_extent: Vec3) -> bool {
    local.x.abs() <= half_extent.x && local.y.abs() <= half_extent.y && local.z.abs() <= half_extent.z
}

/// Where a preset's shape is centred.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LocationSource {
    /// The scan source's own location.
    #[default]
    Actor,
    /// The scan source's view point (camera), falling back to its location.
    View,
}

/// Placement of a scan shape for one request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScanOrigin {
    pub location: Vec3,
    pub yaw: f32,
}

/// Query work for one category: shape, placement and target filters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct QueryPreset {
    pub shape: ScanShape,
    pub location_source: LocationSource,
    pub offset: Vec3,
    /// Rotate `offset` by the source's yaw instead of applying it in world space.
    pub relative_offset: bool,
    pub filters: Vec<TargetFilter>,
    /// A disabled preset has no query work; requests for it are not accepted.
    pub enabled: bool,
}

impl Default for QueryPreset {
    fn default() -> Self {
        Self {
            shape: ScanShape::default(),
            location_source: LocationSource::Actor,
            offset: Vec3::ZERO,
            relative_offset: false,
            filters: TargetFilter::standard(),
            enabled: true,
        }
    }
}

impl QueryPreset {
    pub fn with_shape(shape: ScanShape) -> Self {
        Self {
            shape,
            ..Self::default()
        }
    }

    pub fn has_work(&self) -> bool {
        self.enabled
    }

    pub fn origin(&self, ctx: &InteractorContext, view_location: Option<Vec3>) -> ScanOrigin {
        let yaw = ctx.forward.yaw();
        let base = match self.location_source {
            LocationSource::Actor => ctx.location,
            LocationSource::View => view_location.unwrap_or(ctx.location),
        };
        let offset = if self.relative_offset {
            self.offset.rotate_yaw(yaw)
        } else {
            self.offset
        };
        ScanOrigin {
            location: base + offset,
            yaw,
        }
    }
}

/// True distance from the scan origin, normalised against the shape radius.
pub fn normalized_scan_distance(origin: Vec3, target: Vec3, radius: f32, flat: bool) -> f32 {
    if radius <= SMALL_NUMBER {
        return 1.0;
    }
    (origin.dist_by(target, flat) / radius).clamp(0.0, 1.0)
}

/// One reachable candidate found during a scan cycle.
///
/// Two results are equal when they refer to the same target, whatever their
/// distance.
#[derive(Clone, Debug)]
pub struct ScanResult {
    pub category: CategoryKey,
    pub target: TargetRef,
    pub normalized_distance: f32,
}

impl ScanResult {
    pub fn new(category: CategoryKey, target: TargetRef, normalized_distance: f32) -> Self {
        Self {
            category,
            target,
            normalized_distance: normalized_distance.clamp(0.0, 1.0),
        }
    }
}

impl PartialEq for ScanResult {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
    }
}

impl Eq for ScanResult {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn effective_radius_per_shape() {
        let half_extent = Vec3::new(300.0, 100.0, 50.0);
        assert_eq!(ScanShape::Box { half_extent }.effective_radius(), 200.0);
        assert_eq!(ScanShape::Cylinder { half_extent }.effective_radius(), 200.0);
        assert_eq!(ScanShape::Sphere { radius: 250.0 }.effective_radius(), 250.0);
        assert_eq!(
            ScanShape::Capsule {
                radius: 100.0,
                half_height: 300.0
            }
            .effective_radius(),
            200.0
        );
    }

    #[test]
    fn box_follows_yaw() {
        let shape = ScanShape::Box {
            half_extent: Vec3::new(300.0, 50.0, 50.0),
        };
        let ahead = Vec3::new(250.0, 0.0, 0.0);
        let left = Vec3::new(0.0, 250.0, 0.0);
        assert!(shape.contains(Vec3::ZERO, 0.0, ahead));
        assert!(!shape.contains(Vec3::ZERO, 0.0, left));
        assert!(shape.contains(Vec3::ZERO, FRAC_PI_2, left));
    }

    #[test]
    fn cylinder_trims_box_corners() {
        let shape = ScanShape::Cylinder {
            half_extent: Vec3::new(100.0, 100.0, 50.0),
        };
        assert!(shape.contains(Vec3::ZERO, 0.0, Vec3::new(70.0, 0.0, 40.0)));
        assert!(!shape.contains(Vec3::ZERO, 0.0, Vec3::new(90.0, 90.0, 0.0)));
    }

    #[test]
    fn capsule_is_rounded_at_the_ends() {
        let shape = ScanShape::Capsule {
            radius: 50.0,
            half_height: 150.0,
        };
        assert!(shape.contains(Vec3::ZERO, 0.0, Vec3::new(45.0, 0.0, 100.0)));
        assert!(shape.contains(Vec3::ZERO, 0.0, Vec3::new(0.0, 0.0, 145.0)));
        assert!(!shape.contains(Vec3::ZERO, 0.0, Vec3::new(45.0, 0.0, 140.0)));
    }

    #[test]
    fn relative_offset_rotates_with_the_agent() {
        let preset = QueryPreset {
            offset: Vec3::new(100.0, 0.0, 0.0),
            relative_offset: true,
            ..QueryPreset::default()
        };
        let facing_left = InteractorContext::local(Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0));
        let origin = preset.origin(&facing_left, None);
        assert!(origin.location.x.abs() < 1.0e-3);
        assert!((origin.location.y - 100.0).abs() < 1.0e-3);
    }

    #[test]
    fn view_source_falls_back_to_actor() {
        let preset = QueryPreset {
            location_source: LocationSource::View,
            ..QueryPreset::default()
        };
        let ctx = InteractorContext::local(Vec3::new(5.0, 0.0, 0.0), Vec3::FORWARD);
        assert_eq!(preset.origin(&ctx, None).location, ctx.location);
        let eye = Vec3::new(5.0, 0.0, 60.0);
        assert_eq!(preset.origin(&ctx, Some(eye)).location, eye);
    }

    #[test]
    fn scan_distance_is_clamped() {
        assert_eq!(normalized_scan_distance(Vec3::ZERO, Vec3::new(100.0, 0.0, 0.0), 200.0, false), 0.5);
        assert_eq!(normalized_scan_distance(Vec3::ZERO, Vec3::new(900.0, 0.0, 0.0), 200.0, false), 1.0);
        assert_eq!(normalized_scan_distance(Vec3::ZERO, Vec3::new(0.0, 0.0, 150.0), 200.0, true), 0.0);
    }
}
