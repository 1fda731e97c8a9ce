//! Common error infrastructure for grasp-core.
//!
//! Nothing in the grasp stack is fatal: every failure degrades to "try again
//! later". Errors are therefore classified by *how* the caller retries and how
//! loudly it should log, not by whether it can continue.
//!
//! Domain-specific errors live next to the code that produces them
//! (`ParamsError` here, scan and runtime errors in `grasp-runtime`) and all
//! implement [`GraspError`].

/// Severity level of an error, used for logging and retry decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum ErrorSeverity {
    /// Something is not available yet (agent, registry, world).
    ///
    /// Expected during start-up; retried after the error delay and logged as
    /// a warning.
    Transient,

    /// The agent or a target is configured in a way that can never succeed
    /// as-is (no query work, no grantable capability).
    ///
    /// Retried with the same backoff as transient errors, since a later
    /// configuration change or late initialisation can fix it.
    Configuration,

    /// The upstream engine broke its contract (e.g. silently dropped a
    /// request). Recovered by a forced reset.
    Protocol,

    /// A single candidate is missing required data; only that candidate is
    /// skipped.
    InvalidCandidate,
}

impl ErrorSeverity {
    /// Returns true if the operator should see this at error level.
    pub const fn is_operator_visible(&self) -> bool {
        matches!(self, Self::Configuration | Self::Protocol)
    }
}

/// Common trait for all grasp errors.
pub trait GraspError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// Reasons an [`InteractionParameters`](crate::InteractionParameters) value is rejected.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ParamsError {
    /// Zero angle makes interaction impossible by construction.
    #[error("max angle must be greater than 0 (got {0})")]
    ZeroAngle(f32),

    #[error("max angle must not exceed 360 degrees (got {0})")]
    AngleOutOfRange(f32),

    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: f32 },

    #[error(
        "max highlight distance ({highlight}) must be 0 (disabled) or at least max distance ({distance})"
    )]
    HighlightBelowDistance { highlight: f32, distance: f32 },

    #[error("grant distance threshold must lie in [0, 1] (got {0})")]
    GrantThresholdOutOfRange(f32),
}

impl GraspError for ParamsError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Configuration
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::ZeroAngle(_) => "zero_angle",
            Self::AngleOutOfRange(_) => "angle_out_of_range",
            Self::Negative { .. } => "negative",
            Self::HighlightBelowDistance { .. } => "highlight_below_distance",
            Self::GrantThresholdOutOfRange(_) => "grant_threshold_out_of_range",
        }
    }
}
