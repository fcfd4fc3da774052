//! Strong Wolfe line search.
//!
//! The quasi-Newton steppers minimize `f(x) = -log p(x)`. Given a point x,
//! its value f(x), gradient ∇f(x) and a descent direction p, the search finds
//! a step length α such that y = x + α p satisfies
//!
//! - **Sufficient decrease**: f(y) ≤ f(x) + c₁ α ∇f(x)ᵀp
//! - **Strong curvature**: |∇f(y)ᵀp| ≤ c₂ |∇f(x)ᵀp|
//!
//! with 0 < c₁ < c₂ < 1. The search has two phases: a bracketing phase that
//! grows α by a factor of ten until the conditions hold or an interval
//! containing an acceptable step is found, then a zoom phase that shrinks
//! the interval using safeguarded cubic interpolation (bisection every fifth
//! trial).
//!
//! # Failed evaluations
//!
//! The objective may fail at a trial point. The search treats such a point
//! as unacceptable and pulls the step back toward the last good one instead
//! of aborting, so only a run of `max_restarts` consecutive failures ends
//! the search.

use modeopt_core::{error::ModelResult, types::ParameterVector};
use thiserror::Error;

/// Width below which a zoom interval counts as collapsed.
const MIN_INTERVAL: f64 = 1e-16;

/// Parameters of the Wolfe line search.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSearchParams {
    /// Sufficient decrease constant c₁ ∈ (0, 1)
    pub c1: f64,
    /// Curvature constant c₂ ∈ (c₁, 1)
    pub c2: f64,
    /// Smallest step length considered by step length interpolation
    pub min_alpha: f64,
    /// Maximum number of bracketing iterations
    pub max_iterations: usize,
    /// Maximum number of consecutive failed evaluations
    pub max_restarts: usize,
}

impl Default for LineSearchParams {
    fn default() -> Self {
        Self {
            c1: 1e-4,
            c2: 0.9,
            min_alpha: 1e-12,
            max_iterations: 20,
            max_restarts: 10,
        }
    }
}

impl LineSearchParams {
    /// Validates the constants.
    pub fn validate(&self) -> Result<(), LineSearchError> {
        if !(self.c1 > 0.0 && self.c1 < 1.0) {
            return Err(LineSearchError::InvalidParameter(
                "Sufficient decrease constant c1 must be in (0, 1)",
            ));
        }
        if !(self.c2 > self.c1 && self.c2 < 1.0) {
            return Err(LineSearchError::InvalidParameter(
                "Curvature constant c2 must satisfy c1 < c2 < 1",
            ));
        }
        if !(self.min_alpha > 0.0) {
            return Err(LineSearchError::InvalidParameter(
                "Minimum step length must be positive",
            ));
        }
        if self.max_iterations == 0 {
            return Err(LineSearchError::InvalidParameter(
                "Maximum iterations must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Accepted step of a successful line search.
#[derive(Debug, Clone)]
pub struct LineSearchResult {
    /// Accepted step length α
    pub step_size: f64,
    /// New point x + α p
    pub point: ParameterVector,
    /// Objective value at the new point
    pub value: f64,
    /// Objective gradient at the new point
    pub gradient: ParameterVector,
    /// Objective evaluations performed, failed ones included
    pub evaluations: usize,
}

/// Reasons a line search gives up.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LineSearchError {
    /// ∇f(x)ᵀp is not negative.
    #[error("Search direction is not a descent direction (directional derivative {0})")]
    NotDescent(f64),

    /// The bracketing phase ran out of iterations.
    #[error("Line search exceeded {0} bracketing iterations")]
    MaxIterations(usize),

    /// Too many consecutive trial points could not be evaluated.
    #[error("Line search gave up after {0} consecutive failed evaluations")]
    EvaluationFailures(usize),

    /// The zoom interval shrank below machine resolution.
    #[error("Line search interval collapsed around step length {0}")]
    IntervalCollapsed(f64),

    /// Invalid constants.
    #[error("Invalid line search parameter: {0}")]
    InvalidParameter(&'static str),
}

/// A trial step with its value and directional derivative.
#[derive(Debug, Clone, Copy)]
struct Trial {
    alpha: f64,
    value: f64,
    slope: f64,
}

/// Performs a strong Wolfe line search along `direction`.
///
/// `objective` returns the value and gradient of the function being
/// minimized, or an error when it cannot be evaluated at the given point.
#[allow(clippy::too_many_arguments)]
pub fn wolfe_line_search<F>(
    objective: &mut F,
    x0: &ParameterVector,
    f0: f64,
    g0: &ParameterVector,
    direction: &ParameterVector,
    initial_alpha: f64,
    params: &LineSearchParams,
) -> Result<LineSearchResult, LineSearchError>
where
    F: FnMut(&ParameterVector) -> ModelResult<(f64, ParameterVector)>,
{
    params.validate()?;

    let slope0 = g0.dot(direction);
    if !(slope0 < 0.0) {
        return Err(LineSearchError::NotDescent(slope0));
    }
    let c1_slope = params.c1 * slope0;
    let c2_slope = params.c2 * slope0;

    let mut previous = Trial {
        alpha: 0.0,
        value: f0,
        slope: slope0,
    };
    let mut alpha = initial_alpha;
    let mut evaluations = 0;
    let mut restarts = 0;
    let mut iteration = 0;

    loop {
        if iteration >= params.max_iterations {
            return Err(LineSearchError::MaxIterations(params.max_iterations));
        }

        let point = x0 + direction * alpha;
        evaluations += 1;
        let Ok((value, gradient)) = objective(&point) else {
            if restarts >= params.max_restarts {
                return Err(LineSearchError::EvaluationFailures(restarts));
            }
            restarts += 1;
            alpha = 0.5 * (previous.alpha + alpha);
            continue;
        };
        restarts = 0;

        let slope = gradient.dot(direction);
        let current = Trial { alpha, value, slope };

        if value > f0 + alpha * c1_slope || (iteration > 0 && value >= previous.value) {
            let zoom = Zoom {
                x0,
                f0,
                direction,
                c1_slope,
                c2_slope,
            };
            return zoom.run(objective, previous, current, evaluations);
        }

        if slope.abs() <= -c2_slope {
            return Ok(LineSearchResult {
                step_size: alpha,
                point,
                value,
                gradient,
                evaluations,
            });
        }

        if slope >= 0.0 {
            let zoom = Zoom {
                x0,
                f0,
                direction,
                c1_slope,
                c2_slope,
            };
            return zoom.run(objective, current, previous, evaluations);
        }

        previous = current;
        alpha *= 10.0;
        iteration += 1;
    }
}

/// Fixed quantities of the zoom phase.
struct Zoom<'a> {
    x0: &'a ParameterVector,
    f0: f64,
    direction: &'a ParameterVector,
    c1_slope: f64,
    c2_slope: f64,
}

impl Zoom<'_> {
    /// Shrinks `[lo, hi]` until a step satisfying both conditions is found.
    ///
    /// `lo` always satisfies sufficient decrease and has the lowest value
    /// seen so far; `hi` is the other end of an interval known to contain an
    /// acceptable step.
    fn run<F>(
        &self,
        objective: &mut F,
        mut lo: Trial,
        mut hi: Trial,
        mut evaluations: usize,
    ) -> Result<LineSearchResult, LineSearchError>
    where
        F: FnMut(&ParameterVector) -> ModelResult<(f64, ParameterVector)>,
    {
        let mut iteration = 0usize;
        loop {
            iteration += 1;
            let width = (hi.alpha - lo.alpha).abs();
            if width < MIN_INTERVAL {
                return Err(LineSearchError::IntervalCollapsed(lo.alpha));
            }

            let left = lo.alpha.min(hi.alpha);
            let right = lo.alpha.max(hi.alpha);
            let midpoint = 0.5 * (left + right);
            let mut alpha = if iteration % 5 == 0 {
                midpoint
            } else {
                let guess = cubic_interp(
                    lo.alpha, lo.value, lo.slope, hi.alpha, hi.value, hi.slope, left, right,
                );
                if !guess.is_finite() || guess < left + 0.01 * width || guess > right - 0.01 * width {
                    midpoint
                } else {
                    guess
                }
            };

            let (point, value, gradient) = loop {
                let point = self.x0 + self.direction * alpha;
                evaluations += 1;
                match objective(&point) {
                    Ok((value, gradient)) => break (point, value, gradient),
                    Err(_) => {
                        alpha = 0.5 * (alpha + left);
                        if (alpha - left).abs() < MIN_INTERVAL {
                            return Err(LineSearchError::IntervalCollapsed(alpha));
                        }
                    }
                }
            };

            let slope = gradient.dot(self.direction);
            if value > self.f0 + alpha * self.c1_slope || value >= lo.value {
                hi = Trial { alpha, value, slope };
            } else {
                if slope.abs() <= -self.c2_slope {
                    return Ok(LineSearchResult {
                        step_size: alpha,
                        point,
                        value,
                        gradient,
                        evaluations,
                    });
                }
                if slope * (hi.alpha - lo.alpha) >= 0.0 {
                    hi = lo;
                }
                lo = Trial { alpha, value, slope };
            }
        }
    }
}

/// Minimizer over `[lo, hi]` of the cubic interpolating two points.
///
/// The cubic matches value and derivative `(f0, df0)` at `x0` and
/// `(f1, df1)` at `x1`. Candidates are the interval ends and the cubic's
/// stationary points inside the interval; the one with the lowest cubic
/// value wins.
#[allow(clippy::too_many_arguments)]
pub fn cubic_interp(x0: f64, f0: f64, df0: f64, x1: f64, f1: f64, df1: f64, lo: f64, hi: f64) -> f64 {
    let dx = x1 - x0;
    if dx == 0.0 {
        return 0.5 * (lo + hi);
    }
    let df = f1 - f0;
    let c2 = (3.0 * df - dx * (2.0 * df0 + df1)) / (dx * dx);
    let c3 = (dx * (df0 + df1) - 2.0 * df) / (dx * dx * dx);
    let cubic = |t: f64| f0 + t * (df0 + t * (c2 + t * c3));

    let (t_lo, t_hi) = (lo - x0, hi - x0);
    let mut best_t = t_lo;
    let mut best = cubic(t_lo);
    let mut consider = |t: f64| {
        if t.is_finite() && t >= t_lo && t <= t_hi {
            let value = cubic(t);
            if value < best {
                best = value;
                best_t = t;
            }
        }
    };

    consider(t_hi);
    if c3 != 0.0 {
        // Stationary points of f0 + df0 t + c2 t² + c3 t³
        let discriminant = c2 * c2 - 3.0 * c3 * df0;
        if discriminant >= 0.0 {
            let root = discriminant.sqrt();
            consider((-c2 + root) / (3.0 * c3));
            consider((-c2 - root) / (3.0 * c3));
        }
    } else if c2 != 0.0 {
        consider(-df0 / (2.0 * c2));
    }

    x0 + best_t
}
