//! Interaction parameters published by every interactable target.
use crate::error::ParamsError;
use crate::keys::CapabilityKey;
use crate::math::SMALL_NUMBER;

/// How a target wants to be focused by UI layers. Informational only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FocusMode {
    #[default]
    None,
    /// Focus while the target is interactable.
    Focus,
    /// Focus while the target is highlighted or interactable.
    FocusAlways,
}

/// Distances, angles and thresholds describing how a target may be reached.
///
/// Owned by the target and read-only during queries. All distances are in
/// world units, angles in degrees.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InteractionParameters {
    /// Capability granted while this target is reachable.
    pub capability: Option<CapabilityKey>,

    /// Full cone, in degrees, around the target's forward axis.
    pub max_angle: f32,
    pub max_distance: f32,
    /// Zero disables highlighting.
    pub max_highlight_distance: f32,
    pub max_height_above: f32,
    pub max_height_below: f32,

    /// Primary distance gate ignores height.
    pub distance_2d: bool,
    /// Grant-distance normalisation ignores height.
    pub grant_distance_2d: bool,
    /// Normalised scan distance at or below which the capability is granted.
    pub grant_distance_threshold: f32,

    /// Extra angle allowance for authoritative checks, in percent.
    pub angle_tolerance_pct: f32,
    /// Extra distance allowance for authoritative checks, in percent.
    pub distance_tolerance_pct: f32,

    /// The caller clears the capability itself; reconciliation never revokes it.
    pub manual_clear: bool,
    pub focus: FocusMode,
}

impl Default for InteractionParameters {
    fn default() -> Self {
        Self {
            capability: None,
            max_angle: 360.0,
            max_distance: 200.0,
            max_highlight_distance: 400.0,
            max_height_above: 30.0,
            max_height_below: 30.0,
            distance_2d: false,
            grant_distance_2d: false,
            grant_distance_threshold: 0.7,
            angle_tolerance_pct: 10.0,
            distance_tolerance_pct: 10.0,
            manual_clear: false,
            focus: FocusMode::None,
        }
    }
}

impl InteractionParameters {
    pub fn with_capability(mut self, key: impl Into<CapabilityKey>) -> Self {
        self.capability = Some(key.into());
        self
    }

    pub fn is_highlight_enabled(&self) -> bool {
        self.max_highlight_distance > SMALL_NUMBER
    }

    pub fn angle_tolerance_scalar(&self) -> f32 {
        1.0 + self.angle_tolerance_pct / 100.0
    }

    pub fn distance_tolerance_scalar(&self) -> f32 {
        1.0 + self.distance_tolerance_pct / 100.0
    }

    /// Checks the invariants every published parameter set must satisfy.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.max_angle.abs() <= SMALL_NUMBER {
            return Err(ParamsError::ZeroAngle(self.max_angle));
        }
        if !(0.0..=360.0).contains(&self.max_angle) {
            return Err(ParamsError::AngleOutOfRange(self.max_angle));
        }

        for (field, value) in [
            ("max_distance", self.max_distance),
            ("max_highlight_distance", self.max_highlight_distance),
            ("max_height_above", self.max_height_above),
            ("max_height_below", self.max_height_below),
            ("angle_tolerance_pct", self.angle_tolerance_pct),
            ("distance_tolerance_pct", self.distance_tolerance_pct),
        ] {
            if value < 0.0 {
                return Err(ParamsError::Negative { field, value });
            }
        }

        if self.is_highlight_enabled() && self.max_highlight_distance < self.max_distance {
            return Err(ParamsError::HighlightBelowDistance {
                highlight: self.max_highlight_distance,
                distance: self.max_distance,
            });
        }

        if !(0.0..=1.0).contains(&self.grant_distance_threshold) {
            return Err(ParamsError::GrantThresholdOutOfRange(
                self.grant_distance_threshold,
            ));
        }

        Ok(())
    }

    /// Returns a copy with the highlight distance normalised: near-zero
    /// disables it, anything else is raised to at least `max_distance`.
    pub fn sanitized(&self) -> Self {
        let mut out = self.clone();
        out.max_highlight_distance = if self.is_highlight_enabled() {
            self.max_highlight_distance.max(self.max_distance)
        } else {
            0.0
        };
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = InteractionParameters::default();
        assert!(params.validate().is_ok());
        assert!(params.is_highlight_enabled());
        assert!((params.distance_tolerance_scalar() - 1.1).abs() < 1.0e-6);
    }

    #[test]
    fn zero_angle_is_rejected() {
        let params = InteractionParameters {
            max_angle: 0.0,
            ..Default::default()
        };
        assert_eq!(params.validate(), Err(ParamsError::ZeroAngle(0.0)));
    }

    #[test]
    fn highlight_below_distance_is_rejected() {
        let params = InteractionParameters {
            max_distance: 300.0,
            max_highlight_distance: 250.0,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ParamsError::HighlightBelowDistance { .. })
        ));

        let disabled = InteractionParameters {
            max_distance: 300.0,
            max_highlight_distance: 0.0,
            ..Default::default()
        };
        assert!(disabled.validate().is_ok());
    }

    #[test]
    fn sanitized_raises_highlight_to_distance() {
        let params = InteractionParameters {
            max_distance: 300.0,
            max_highlight_distance: 250.0,
            ..Default::default()
        };
        let fixed = params.sanitized();
        assert_eq!(fixed.max_highlight_distance, 300.0);
        assert!(fixed.validate().is_ok());

        let tiny = InteractionParameters {
            max_highlight_distance: 1.0e-6,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(tiny.max_highlight_distance, 0.0);
    }
}
