//! Quasi-Newton steppers.
//!
//! A [`Stepper`] owns the iterate of a quasi-Newton run and advances it one
//! accepted line-search step at a time, deciding after each step whether the
//! run has reached a terminal status. The driver in [`crate::driver`] only
//! reports progress and forwards output; every convergence decision is made
//! here.
//!
//! Internally the steppers minimize `f(x) = -log p(x)`. Reported values
//! (`log_density`) are converted back to the log density.

use crate::line_search::{wolfe_line_search, LineSearchError, LineSearchParams, LineSearchResult};
use crate::update::{BfgsUpdate, LbfgsUpdate, QuasiNewtonUpdate};
use log::{debug, warn};
use modeopt_core::{
    model::{checked_log_density, LogDensity},
    policy::ConvergencePolicy,
    status::TerminationStatus,
    types::ParameterVector,
};
use std::mem;

/// Result of one [`Stepper::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Keep iterating.
    Continue,
    /// Stop with the given status.
    Terminate(TerminationStatus),
}

impl StepOutcome {
    /// Returns true for `Terminate`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Terminate(_))
    }
}

/// Per-iteration diagnostics shown in progress reports.
#[derive(Debug, Clone, PartialEq)]
pub struct StepProgress {
    /// Iteration number (1-based)
    pub iteration: usize,
    /// Log density at the current iterate
    pub log_density: f64,
    /// Norm of the last accepted step
    pub step_norm: f64,
    /// Gradient norm at the current iterate
    pub gradient_norm: f64,
    /// Accepted step length
    pub alpha: f64,
    /// Initial step length tried by the line search
    pub alpha0: f64,
    /// Total model evaluations so far
    pub evaluations: usize,
    /// Free-form note, e.g. a Hessian reset
    pub note: String,
}

/// Iterative engine driven by [`crate::driver::QuasiNewtonDriver`].
pub trait Stepper {
    /// Performs one iteration.
    fn advance(&mut self) -> StepOutcome;

    /// Number of `advance` calls so far.
    fn iteration(&self) -> usize;

    /// Current iterate.
    fn parameters(&self) -> &ParameterVector;

    /// Log density at the current iterate (−∞ if it could not be evaluated).
    fn log_density(&self) -> f64;

    /// Diagnostics of the last iteration.
    fn progress(&self) -> StepProgress;

    /// Takes the diagnostic messages buffered since the last call.
    fn drain_messages(&mut self) -> Vec<String>;
}

/// Quasi-Newton stepper with a strong Wolfe line search.
///
/// The curvature model `U` decides between dense BFGS and L-BFGS; the
/// line search, reset logic and convergence tests are shared.
///
/// # Iteration
///
/// Each [`advance`](Stepper::advance):
///
/// 1. picks the initial trial step (`init_alpha` on the first iteration or
///    after a reset, otherwise a cubic estimate from the previous step
///    capped at 1),
/// 2. runs the line search along the current direction; on failure the
///    curvature model is reset and the search retried once along the
///    steepest-descent direction,
/// 3. tests the convergence criteria of the [`ConvergencePolicy`] in a
///    fixed order,
/// 4. otherwise updates the curvature model and computes the next
///    direction.
#[derive(Debug)]
pub struct BfgsLineSearch<'m, M: ?Sized, U> {
    model: &'m M,
    update: U,
    policy: ConvergencePolicy,
    line_search: LineSearchParams,

    x: ParameterVector,
    f: f64,
    g: ParameterVector,
    p: ParameterVector,

    x_prev: ParameterVector,
    f_prev: f64,
    g_prev: ParameterVector,
    p_prev: ParameterVector,

    alpha: f64,
    alpha0: f64,
    step_norm: f64,
    iteration: usize,
    evaluations: usize,
    evaluated: bool,
    note: String,
    messages: Vec<String>,
}

/// Dense BFGS stepper.
pub type Bfgs<'m, M> = BfgsLineSearch<'m, M, BfgsUpdate>;

/// L-BFGS stepper.
pub type Lbfgs<'m, M> = BfgsLineSearch<'m, M, LbfgsUpdate>;

impl<'m, M, U> BfgsLineSearch<'m, M, U>
where
    M: LogDensity + ?Sized,
    U: QuasiNewtonUpdate,
{
    /// Creates a stepper at `initial` and evaluates the model there.
    ///
    /// Construction never fails. If the model cannot be evaluated at the
    /// initial point the failure is buffered as a message and the first
    /// `advance` reports [`TerminationStatus::LineSearchFailed`].
    pub fn new(model: &'m M, initial: ParameterVector, update: U) -> Self {
        let n = initial.len();
        let mut stepper = Self {
            model,
            update,
            policy: ConvergencePolicy::default(),
            line_search: LineSearchParams::default(),
            x: initial,
            f: f64::INFINITY,
            g: ParameterVector::zeros(n),
            p: ParameterVector::zeros(n),
            x_prev: ParameterVector::zeros(n),
            f_prev: f64::INFINITY,
            g_prev: ParameterVector::zeros(n),
            p_prev: ParameterVector::zeros(n),
            alpha: 0.0,
            alpha0: 0.0,
            step_norm: 0.0,
            iteration: 0,
            evaluations: 0,
            evaluated: false,
            note: String::new(),
            messages: Vec::new(),
        };
        stepper.initialize();
        stepper
    }

    /// Replaces the convergence policy.
    pub fn with_policy(mut self, policy: ConvergencePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the line search constants.
    pub fn with_line_search(mut self, params: LineSearchParams) -> Self {
        self.line_search = params;
        self
    }

    /// The convergence policy in use.
    pub fn policy(&self) -> &ConvergencePolicy {
        &self.policy
    }

    /// The curvature model.
    pub fn update_rule(&self) -> &U {
        &self.update
    }

    fn initialize(&mut self) {
        self.evaluations = 1;
        match checked_log_density(self.model, &self.x) {
            Ok((lp, grad)) => {
                self.f = -lp;
                self.g = -grad;
                self.evaluated = true;
            }
            Err(err) => {
                warn!("initial point could not be evaluated: {err}");
                self.messages.push(err.to_string());
                self.f = f64::INFINITY;
                self.evaluated = false;
            }
        }
        self.p = -&self.g;
        self.x_prev.clone_from(&self.x);
        self.f_prev = self.f;
        self.g_prev.clone_from(&self.g);
    }

    /// Initial trial step after a successful iteration.
    fn initial_step(&self) -> f64 {
        let estimate = crate::line_search::cubic_interp(
            0.0,
            0.0,
            self.g_prev.dot(&self.p_prev),
            self.alpha,
            self.f - self.f_prev,
            self.g.dot(&self.p_prev),
            self.line_search.min_alpha,
            1.0,
        );
        let alpha0 = (1.01 * estimate).min(1.0);
        if alpha0.is_finite() && alpha0 > 0.0 {
            alpha0
        } else {
            self.policy.init_alpha
        }
    }

    fn search(&mut self, alpha0: f64) -> Result<LineSearchResult, LineSearchError> {
        let model = self.model;
        let messages = &mut self.messages;
        let evaluations = &mut self.evaluations;
        let mut objective = |x: &ParameterVector| {
            *evaluations += 1;
            match checked_log_density(model, x) {
                Ok((lp, grad)) => Ok((-lp, -grad)),
                Err(err) => {
                    debug!("trial point rejected: {err}");
                    messages.push(err.to_string());
                    Err(err)
                }
            }
        };
        wolfe_line_search(
            &mut objective,
            &self.x,
            self.f,
            &self.g,
            &self.p,
            alpha0,
            &self.line_search,
        )
    }

    /// Runs the convergence tests on the accepted step, in order.
    fn check_convergence(&self) -> Option<TerminationStatus> {
        let policy = &self.policy;
        let decrease = self.f_prev - self.f;

        if decrease.abs() < policy.tol_obj {
            return Some(TerminationStatus::ObjectiveConverged);
        }
        if self.g.norm() < policy.tol_grad {
            return Some(TerminationStatus::GradientConverged);
        }
        if self.step_norm < policy.tol_param {
            return Some(TerminationStatus::ParamConverged);
        }
        if self.iteration >= policy.max_iterations {
            return Some(TerminationStatus::MaxIterations);
        }
        let scale = self.f_prev.abs().max(self.f.abs()).max(1.0);
        if decrease / scale < policy.tol_rel_obj * f64::EPSILON {
            return Some(TerminationStatus::ObjectiveConverged);
        }
        None
    }
}

impl<M, U> Stepper for BfgsLineSearch<'_, M, U>
where
    M: LogDensity + ?Sized,
    U: QuasiNewtonUpdate,
{
    fn advance(&mut self) -> StepOutcome {
        self.iteration += 1;
        self.note.clear();

        if !self.evaluated {
            self.note.push_str("initial point not evaluable");
            return StepOutcome::Terminate(TerminationStatus::LineSearchFailed);
        }

        let mut reset = self.iteration == 1;
        let accepted = loop {
            if reset {
                self.p = -&self.g;
            }
            self.alpha0 = if reset {
                self.policy.init_alpha
            } else {
                self.initial_step()
            };

            match self.search(self.alpha0) {
                Ok(accepted) => break accepted,
                Err(err) if reset => {
                    warn!("line search failed after reset: {err}");
                    self.messages.push(format!("Line search failed: {err}"));
                    return StepOutcome::Terminate(TerminationStatus::LineSearchFailed);
                }
                Err(err) => {
                    warn!("line search failed, resetting curvature: {err}");
                    self.note.push_str("LS failed, Hessian reset");
                    self.update.clear();
                    reset = true;
                }
            }
        };

        self.alpha = accepted.step_size;
        self.x_prev = mem::replace(&mut self.x, accepted.point);
        self.f_prev = mem::replace(&mut self.f, accepted.value);
        self.g_prev = mem::replace(&mut self.g, accepted.gradient);
        self.p_prev.clone_from(&self.p);

        let s = &self.x - &self.x_prev;
        let y = &self.g - &self.g_prev;
        self.step_norm = s.norm();

        if let Some(status) = self.check_convergence() {
            debug!("iteration {}: {status}", self.iteration);
            return StepOutcome::Terminate(status);
        }

        let scale = self.update.update(&y, &s, reset);
        if reset {
            self.p_prev /= scale;
        }
        self.p = self.update.search_direction(&self.g);

        let relative_gradient = -self.p.dot(&self.g) / self.f.abs().max(1.0);
        if relative_gradient < self.policy.tol_rel_grad * f64::EPSILON {
            debug!("iteration {}: relative gradient {relative_gradient:.3e}", self.iteration);
            return StepOutcome::Terminate(TerminationStatus::GradientConverged);
        }

        StepOutcome::Continue
    }

    fn iteration(&self) -> usize {
        self.iteration
    }

    fn parameters(&self) -> &ParameterVector {
        &self.x
    }

    fn log_density(&self) -> f64 {
        -self.f
    }

    fn progress(&self) -> StepProgress {
        StepProgress {
            iteration: self.iteration,
            log_density: -self.f,
            step_norm: self.step_norm,
            gradient_norm: self.g.norm(),
            alpha: self.alpha,
            alpha0: self.alpha0,
            evaluations: self.evaluations,
            note: self.note.clone(),
        }
    }

    fn drain_messages(&mut self) -> Vec<String> {
        mem::take(&mut self.messages)
    }
}
