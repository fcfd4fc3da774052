//! Newton's method for log-density maximization.
//!
//! Each Newton step solves against the Hessian of the log density. Since the
//! Hessian need not be negative definite away from the mode, the step uses
//! its eigendecomposition H = V Λ Vᵀ with the eigenvalues replaced by their
//! absolute values:
//!
//! d = V |Λ|⁻¹ Vᵀ ∇log p(x)
//!
//! which is always an ascent direction. The step length starts at 1 and is
//! halved until the log density does not decrease.
//!
//! # Stopping rule
//!
//! The driver stops once the relative improvement `(lp - lp_prev) / |lp|`
//! drops to 1e-8 or below. The first iteration always runs.

use crate::report::OptimizeReport;
use log::{debug, warn};
use modeopt_core::{
    config::NewtonConfig,
    error::{ModelError, ModelResult},
    model::{checked_log_density, LogDensity},
    sinks::Sinks,
    status::TerminationStatus,
    types::{
        constants::{EIGENVALUE_FLOOR, NEWTON_MIN_STEP, NEWTON_RELATIVE_TOLERANCE, NEWTON_SEED_FACTOR},
        ParameterMatrix, ParameterVector,
    },
};

/// Ascent direction `V |Λ|⁻¹ Vᵀ g` for a symmetric Hessian `H = V Λ Vᵀ`.
///
/// Eigenvalues smaller in magnitude than [`EIGENVALUE_FLOOR`] are clamped
/// so that flat directions do not produce unbounded steps.
pub fn modified_newton_direction(
    hessian: ParameterMatrix,
    gradient: &ParameterVector,
) -> ParameterVector {
    let eigen = hessian.symmetric_eigen();
    let mut projected = eigen.eigenvectors.transpose() * gradient;
    for (coefficient, lambda) in projected.iter_mut().zip(eigen.eigenvalues.iter()) {
        *coefficient /= lambda.abs().max(EIGENVALUE_FLOOR);
    }
    eigen.eigenvectors * projected
}

/// Performs one Newton step in place and returns the new log density.
///
/// Trial points that fail to evaluate count as −∞ and are not reported.
/// If no step length down to [`NEWTON_MIN_STEP`] yields an improvement the
/// parameters are left unchanged and the current log density is returned.
///
/// # Errors
///
/// Returns an error if the model or its Hessian cannot be evaluated at the
/// current point.
pub fn newton_step<M>(model: &M, params: &mut ParameterVector) -> ModelResult<f64>
where
    M: LogDensity + ?Sized,
{
    let (current, gradient) = checked_log_density(model, params)?;
    let hessian = model.hessian(params)?;
    if hessian.iter().any(|h| !h.is_finite()) {
        return Err(ModelError::evaluation("Hessian is not finite"));
    }
    let direction = modified_newton_direction(hessian, &gradient);

    let mut step = 1.0;
    while step >= NEWTON_MIN_STEP {
        let candidate = &*params + &direction * step;
        let value = checked_log_density(model, &candidate).map_or(f64::NEG_INFINITY, |(lp, _)| lp);
        if value >= current {
            *params = candidate;
            return Ok(value);
        }
        step *= 0.5;
    }

    debug!("no improving Newton step found, keeping the current point");
    Ok(current)
}

/// Relative improvement `(value - last) / |value|`.
fn relative_improvement(value: f64, last: f64) -> f64 {
    (value - last) / value.abs()
}

/// Driver running [`newton_step`] until the log density stops improving.
#[derive(Debug)]
pub struct NewtonDriver<'m, M: ?Sized> {
    model: &'m M,
    config: NewtonConfig,
    save_iterations: bool,
}

impl<'m, M> NewtonDriver<'m, M>
where
    M: LogDensity + ?Sized,
{
    /// Creates a driver for `model`.
    pub fn new(model: &'m M, config: NewtonConfig) -> Self {
        Self {
            model,
            config,
            save_iterations: false,
        }
    }

    /// Emit a record for the initial point and every iterate.
    pub fn with_save_iterations(mut self, save: bool) -> Self {
        self.save_iterations = save;
        self
    }

    /// Runs Newton's method from `initial`.
    ///
    /// Model failures never abort the run: they are written to the error
    /// sink. A point that cannot be evaluated has log density −∞. If the
    /// step from an evaluable point fails (typically its Hessian), the run
    /// stops there with [`TerminationStatus::LineSearchFailed`] and keeps
    /// the point's log density.
    pub fn run(&self, initial: ParameterVector, sinks: &mut Sinks<'_>) -> OptimizeReport {
        let mut params = initial;
        let mut value = match checked_log_density(self.model, &params) {
            Ok((lp, _)) => lp,
            Err(err) => {
                warn!("initial log density could not be evaluated: {err}");
                sinks.error(&err.to_string());
                f64::NEG_INFINITY
            }
        };
        sinks.info(&format!("initial log joint probability = {value}"));
        if self.save_iterations {
            sinks.record(0, value, &params);
        }

        let mut last = value * NEWTON_SEED_FACTOR;
        debug!(
            "Newton seed improvement {:.3e}",
            relative_improvement(value, last)
        );

        let mut iteration = 0;
        let status = loop {
            // NaN (e.g. both values −∞) counts as no improvement
            let improving = relative_improvement(value, last) > NEWTON_RELATIVE_TOLERANCE;
            if iteration > 0 && !improving {
                break TerminationStatus::Ok;
            }
            if iteration >= self.config.max_iterations {
                break TerminationStatus::MaxIterations;
            }

            last = value;
            let mut stalled = false;
            value = match newton_step(self.model, &mut params) {
                Ok(lp) => lp,
                Err(err) => {
                    warn!("Newton step failed: {err}");
                    sinks.error(&err.to_string());
                    // The point did not move; only an unevaluable point counts as −∞
                    stalled = last.is_finite();
                    if stalled {
                        last
                    } else {
                        f64::NEG_INFINITY
                    }
                }
            };
            iteration += 1;

            sinks.info(&format!(
                "Iteration {iteration:>2}. Log joint probability = {value:>10}. Improved by {}.",
                value - last
            ));
            if self.save_iterations {
                sinks.record(iteration, value, &params);
            }
            if sinks.interrupted() {
                break TerminationStatus::Interrupted;
            }
            if stalled {
                break TerminationStatus::LineSearchFailed;
            }
        };

        if !self.save_iterations {
            sinks.record(iteration, value, &params);
        }

        OptimizeReport {
            status,
            parameters: params,
            log_density: value,
            iterations: iteration,
        }
    }
}
