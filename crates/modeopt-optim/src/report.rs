//! Summary of a finished optimization run.

use modeopt_core::{status::TerminationStatus, types::ParameterVector};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Final state of an optimization run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OptimizeReport {
    /// Terminal status
    pub status: TerminationStatus,
    /// Final iterate
    pub parameters: ParameterVector,
    /// Log density at the final iterate
    pub log_density: f64,
    /// Number of iterations performed
    pub iterations: usize,
}

impl OptimizeReport {
    /// Returns true if a convergence criterion was satisfied.
    pub fn converged(&self) -> bool {
        self.status.is_converged()
    }
}

impl fmt::Display for OptimizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} after {} iterations, log density = {}",
            self.status, self.iterations, self.log_density
        )
    }
}
