//! Type aliases and numerical constants.

use nalgebra::{DMatrix, DVector};

/// Continuous parameter vector; its length is the model dimension.
pub type ParameterVector = DVector<f64>;

/// Square matrix over the parameter space (Hessians, inverse Hessians).
pub type ParameterMatrix = DMatrix<f64>;

/// Numerical constants shared by the drivers.
pub mod constants {
    /// Name of the synthetic log-density column leading every header.
    pub const LOG_DENSITY_NAME: &str = "lp__";

    /// Relative improvement below which the Newton driver stops.
    pub const NEWTON_RELATIVE_TOLERANCE: f64 = 1e-8;

    /// Factor applied to the initial log density to seed the first Newton check.
    pub const NEWTON_SEED_FACTOR: f64 = 1.1;

    /// Step used by the finite-difference Hessian.
    pub const HESSIAN_FD_STEP: f64 = 1e-3;

    /// Smallest Newton step length tried before giving up on a step.
    pub const NEWTON_MIN_STEP: f64 = 1e-50;

    /// Eigenvalue magnitudes below this are clamped when inverting a Hessian.
    pub const EIGENVALUE_FLOOR: f64 = 1e-12;
}
