use crate::keys::CategoryKey;
use crate::math::Vec3;

/// A spot on a target from which it can be interacted with.
///
/// Targets without explicit markers expose a single point at their own
/// transform.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InteractionPoint {
    pub location: Vec3,
    pub forward: Vec3,
    #[cfg_attr(feature = "serde", serde(default))]
    pub category: Option<CategoryKey>,
}

impl InteractionPoint {
    pub fn new(location: Vec3, forward: Vec3) -> Self {
        Self {
            location,
            forward,
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<CategoryKey>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Whether this point serves the given query channel. Untagged points
    /// serve every channel.
    pub fn serves(&self, category: &CategoryKey) -> bool {
        self.category.as_ref().is_none_or(|c| c == category)
    }
}

/// Sorts points nearest-first relative to `origin`.
pub fn sort_nearest_first(points: &mut [InteractionPoint], origin: Vec3, flat: bool) {
    points.sort_by(|a, b| {
        let da = origin.dist_by(a.location, flat);
        let db = origin.dist_by(b.location, flat);
        da.total_cmp(&db)
    });
}
