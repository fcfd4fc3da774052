//! Terminal outcomes of an optimization run.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// The single terminal outcome of an optimization run.
///
/// Quasi-Newton steppers report these verbatim; the Newton driver produces
/// `Ok`, `MaxIterations` or `Interrupted`; the dispatcher produces
/// `UsageError` for an unknown algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum TerminationStatus {
    /// Converged under the driver's own stopping rule
    Ok,
    /// Iteration budget exhausted
    MaxIterations,
    /// Absolute or relative gradient magnitude below tolerance
    GradientConverged,
    /// Absolute or relative objective change below tolerance
    ObjectiveConverged,
    /// Parameter change below tolerance
    ParamConverged,
    /// Line search could not achieve sufficient increase, even after a reset
    LineSearchFailed,
    /// The caller's interrupt hook requested cancellation
    Interrupted,
    /// Unknown algorithm selection
    UsageError,
}

impl TerminationStatus {
    /// Returns true for failure outcomes.
    ///
    /// Interruption and hitting the iteration cap are not failures: the run
    /// stopped early but the current iterate is valid.
    pub fn is_error(self) -> bool {
        matches!(self, Self::LineSearchFailed | Self::UsageError)
    }

    /// Returns true if a convergence criterion was satisfied.
    pub fn is_converged(self) -> bool {
        matches!(
            self,
            Self::Ok | Self::GradientConverged | Self::ObjectiveConverged | Self::ParamConverged
        )
    }

    /// Process exit code following the sysexits convention.
    pub fn exit_code(self) -> i32 {
        match self {
            Self::UsageError => 64,
            Self::LineSearchFailed => 70,
            _ => 0,
        }
    }

    /// Human-readable explanation of the outcome.
    pub fn description(self) -> &'static str {
        match self {
            Self::Ok => "Convergence detected: relative improvement in log density is below tolerance",
            Self::MaxIterations => "Maximum number of iterations hit, may not be at an optima",
            Self::GradientConverged => "Convergence detected: gradient norm is below tolerance",
            Self::ObjectiveConverged => {
                "Convergence detected: change in objective function was below tolerance"
            }
            Self::ParamConverged => "Convergence detected: absolute parameter change was below tolerance",
            Self::LineSearchFailed => {
                "Line search failed to achieve a sufficient decrease, no more progress can be made"
            }
            Self::Interrupted => "Optimization interrupted by request",
            Self::UsageError => "Unknown optimization algorithm",
        }
    }
}

impl fmt::Display for TerminationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "OK",
            Self::MaxIterations => "MAX_ITERATIONS",
            Self::GradientConverged => "GRADIENT_CONVERGED",
            Self::ObjectiveConverged => "OBJECTIVE_CONVERGED",
            Self::ParamConverged => "PARAM_CONVERGED",
            Self::LineSearchFailed => "LINE_SEARCH_FAILED",
            Self::Interrupted => "INTERRUPTED",
            Self::UsageError => "USAGE_ERROR",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(TerminationStatus::LineSearchFailed.is_error());
        assert!(TerminationStatus::UsageError.is_error());
        assert!(!TerminationStatus::Interrupted.is_error());
        assert!(!TerminationStatus::MaxIterations.is_error());
        assert!(!TerminationStatus::Interrupted.is_converged());
        assert!(TerminationStatus::ParamConverged.is_converged());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(TerminationStatus::Ok.exit_code(), 0);
        assert_eq!(TerminationStatus::Interrupted.exit_code(), 0);
        assert_eq!(TerminationStatus::UsageError.exit_code(), 64);
        assert_eq!(TerminationStatus::LineSearchFailed.exit_code(), 70);
    }

    #[test]
    fn test_display() {
        assert_eq!(TerminationStatus::GradientConverged.to_string(), "GRADIENT_CONVERGED");
        assert_eq!(TerminationStatus::UsageError.to_string(), "USAGE_ERROR");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_names_match_display() {
        let json = serde_json::to_string(&TerminationStatus::LineSearchFailed).unwrap();
        assert_eq!(json, "\"LINE_SEARCH_FAILED\"");
    }
}
