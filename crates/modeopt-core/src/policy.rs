//! Convergence tolerances for the quasi-Newton steppers.
//!
//! A [`ConvergencePolicy`] is created once per run and never mutated
//! afterwards. The relative tolerances are expressed in units of machine
//! epsilon, so `tol_rel_obj = 1e4` means a relative change of
//! `1e4 * f64::EPSILON ≈ 2.2e-12`.

use crate::error::ConfigError;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Numeric tolerances governing when a run is considered converged.
///
/// # Criteria
///
/// - **tol_obj**: |f(xₖ) - f(xₖ₋₁)| < tol_obj
/// - **tol_rel_obj**: |f(xₖ) - f(xₖ₋₁)| / max(|f(xₖ)|, |f(xₖ₋₁)|, 1) < tol_rel_obj · ε
/// - **tol_grad**: ‖∇f(xₖ)‖ < tol_grad
/// - **tol_rel_grad**: ∇fᵀ Ĥ⁻¹ ∇f / max(|f(xₖ)|, 1) < tol_rel_grad · ε
/// - **tol_param**: ‖xₖ - xₖ₋₁‖ < tol_param
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConvergencePolicy {
    /// Maximum number of iterations
    pub max_iterations: usize,
    /// Absolute objective change tolerance
    pub tol_obj: f64,
    /// Relative objective change tolerance, in units of machine epsilon
    pub tol_rel_obj: f64,
    /// Absolute gradient norm tolerance
    pub tol_grad: f64,
    /// Relative gradient tolerance, in units of machine epsilon
    pub tol_rel_grad: f64,
    /// Absolute parameter change tolerance
    pub tol_param: f64,
    /// First trial step length of the line search
    pub init_alpha: f64,
    /// Number of correction pairs kept by L-BFGS
    pub history_size: usize,
}

impl Default for ConvergencePolicy {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            tol_obj: 1e-12,
            tol_rel_obj: 1e4,
            tol_grad: 1e-8,
            tol_rel_grad: 1e7,
            tol_param: 1e-8,
            init_alpha: 1e-3,
            history_size: 5,
        }
    }
}

impl ConvergencePolicy {
    /// Creates a policy with the default tolerances.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the absolute and relative objective tolerances.
    pub fn with_objective_tolerances(mut self, abs: f64, rel: f64) -> Self {
        self.tol_obj = abs;
        self.tol_rel_obj = rel;
        self
    }

    /// Sets the absolute and relative gradient tolerances.
    pub fn with_gradient_tolerances(mut self, abs: f64, rel: f64) -> Self {
        self.tol_grad = abs;
        self.tol_rel_grad = rel;
        self
    }

    /// Sets the parameter change tolerance.
    pub fn with_param_tolerance(mut self, tol: f64) -> Self {
        self.tol_param = tol;
        self
    }

    /// Sets the initial line search step length.
    pub fn with_init_alpha(mut self, alpha: f64) -> Self {
        self.init_alpha = alpha;
        self
    }

    /// Sets the L-BFGS history size.
    pub fn with_history_size(mut self, size: usize) -> Self {
        self.history_size = size;
        self
    }

    /// Checks every field except `history_size` against its admissible
    /// range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::invalid_option(
                "iter",
                self.max_iterations,
                "must be a positive integer",
            ));
        }

        let reals = [
            ("init_alpha", self.init_alpha),
            ("tol_obj", self.tol_obj),
            ("tol_rel_obj", self.tol_rel_obj),
            ("tol_grad", self.tol_grad),
            ("tol_rel_grad", self.tol_rel_grad),
            ("tol_param", self.tol_param),
        ];
        for (name, value) in reals {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::invalid_option(
                    name,
                    value,
                    "must be a finite positive number",
                ));
            }
        }

        Ok(())
    }

    /// Checks the L-BFGS history size. Only L-BFGS runs call this.
    pub fn validate_history_size(&self) -> Result<(), ConfigError> {
        if self.history_size == 0 {
            return Err(ConfigError::invalid_option(
                "history_size",
                self.history_size,
                "must be a positive integer",
            ));
        }
        Ok(())
    }
}
