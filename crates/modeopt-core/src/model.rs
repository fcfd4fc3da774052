//! Model interface consumed by the optimizers.
//!
//! A model is a pure function from a parameter vector to a log density and
//! its gradient. The optimizers maximize the log density; they never see the
//! model's internals and only require that evaluation either succeeds with
//! finite numbers or fails with a [`ModelError`].
//!
//! # Failure policy
//!
//! Evaluation failures are expected during optimization (line searches probe
//! points outside the support, intermediate computations overflow, ...). Use
//! [`checked_log_density`] rather than calling [`LogDensity::log_density`]
//! directly: it folds non-finite results into [`ModelError::NonFinite`], so
//! callers only have one failure path to handle.

use crate::{
    error::{ModelError, ModelResult},
    types::{constants::HESSIAN_FD_STEP, ParameterMatrix, ParameterVector},
};
use std::fmt::Debug;

/// A differentiable log density over a continuous parameter vector.
pub trait LogDensity: Debug {
    /// Number of continuous parameters.
    fn dimension(&self) -> usize;

    /// Ordered parameter names, one per dimension.
    ///
    /// The default names are `theta.1`, `theta.2`, ...
    fn parameter_names(&self) -> Vec<String> {
        (1..=self.dimension()).map(|i| format!("theta.{i}")).collect()
    }

    /// Evaluates the log density and its gradient at `params`.
    fn log_density(&self, params: &ParameterVector) -> ModelResult<(f64, ParameterVector)>;

    /// Evaluates the Hessian of the log density at `params`.
    ///
    /// # Default Implementation
    ///
    /// Finite differences of the gradient, see [`finite_difference_hessian`].
    fn hessian(&self, params: &ParameterVector) -> ModelResult<ParameterMatrix> {
        finite_difference_hessian(self, params)
    }
}

impl<M: LogDensity + ?Sized> LogDensity for &M {
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn parameter_names(&self) -> Vec<String> {
        (**self).parameter_names()
    }

    fn log_density(&self, params: &ParameterVector) -> ModelResult<(f64, ParameterVector)> {
        (**self).log_density(params)
    }

    fn hessian(&self, params: &ParameterVector) -> ModelResult<ParameterMatrix> {
        (**self).hessian(params)
    }
}

/// Evaluates a model and rejects non-finite or mis-sized results.
pub fn checked_log_density<M>(model: &M, params: &ParameterVector) -> ModelResult<(f64, ParameterVector)>
where
    M: LogDensity + ?Sized,
{
    let (value, gradient) = model.log_density(params)?;
    if !value.is_finite() {
        return Err(ModelError::non_finite_value());
    }
    if gradient.len() != params.len() {
        return Err(ModelError::dimension_mismatch(params.len(), gradient.len()));
    }
    if gradient.iter().any(|g| !g.is_finite()) {
        return Err(ModelError::non_finite_gradient());
    }
    Ok((value, gradient))
}

/// Approximates the Hessian by differencing gradients.
///
/// Uses the fourth-order central stencil
/// `(g(x-2h) - 8 g(x-h) + 8 g(x+h) - g(x+2h)) / 12h` along each coordinate
/// and symmetrizes the result. Costs `4 n` gradient evaluations.
pub fn finite_difference_hessian<M>(model: &M, params: &ParameterVector) -> ModelResult<ParameterMatrix>
where
    M: LogDensity + ?Sized,
{
    const PERTURBATIONS: [f64; 4] = [-2.0, -1.0, 1.0, 2.0];
    const COEFFICIENTS: [f64; 4] = [1.0 / 12.0, -2.0 / 3.0, 2.0 / 3.0, -1.0 / 12.0];

    let n = params.len();
    let h = HESSIAN_FD_STEP;
    let mut hessian = ParameterMatrix::zeros(n, n);
    let mut shifted = params.clone();

    for d in 0..n {
        for (&p, &c) in PERTURBATIONS.iter().zip(COEFFICIENTS.iter()) {
            shifted[d] = params[d] + p * h;
            let (_, grad) = checked_log_density(model, &shifted)?;
            for dd in 0..n {
                let contribution = 0.5 * c * grad[dd] / h;
                hessian[(d, dd)] += contribution;
                hessian[(dd, d)] += contribution;
            }
        }
        shifted[d] = params[d];
    }

    Ok(hessian)
}
