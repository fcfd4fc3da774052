//! Test models and helpers shared by the workspace's tests and benchmarks.

use crate::{
    error::{ModelError, ModelResult},
    model::LogDensity,
    sinks::Interrupt,
    types::{ParameterMatrix, ParameterVector},
};
use std::cell::Cell;

/// Concave quadratic `-Σ wᵢ (xᵢ - mᵢ)²` with its mode at `m`.
#[derive(Debug, Clone)]
pub struct ConcaveQuadratic {
    center: ParameterVector,
    weights: ParameterVector,
    exact_hessian: bool,
}

impl ConcaveQuadratic {
    /// Unit weights around `center`.
    pub fn new(center: ParameterVector) -> Self {
        let weights = ParameterVector::from_element(center.len(), 1.0);
        Self {
            center,
            weights,
            exact_hessian: true,
        }
    }

    /// Per-coordinate weights (all must be positive).
    pub fn with_weights(mut self, weights: ParameterVector) -> Self {
        assert_eq!(weights.len(), self.center.len());
        self.weights = weights;
        self
    }

    /// Makes `hessian` fall back to finite differences.
    pub fn with_finite_difference_hessian(mut self) -> Self {
        self.exact_hessian = false;
        self
    }

    /// The mode.
    pub fn center(&self) -> &ParameterVector {
        &self.center
    }
}

impl LogDensity for ConcaveQuadratic {
    fn dimension(&self) -> usize {
        self.center.len()
    }

    fn log_density(&self, x: &ParameterVector) -> ModelResult<(f64, ParameterVector)> {
        let diff = x - &self.center;
        let weighted = diff.component_mul(&self.weights);
        Ok((-weighted.dot(&diff), -2.0 * weighted))
    }

    fn hessian(&self, x: &ParameterVector) -> ModelResult<ParameterMatrix> {
        if self.exact_hessian {
            Ok(ParameterMatrix::from_diagonal(&(-2.0 * &self.weights)))
        } else {
            crate::model::finite_difference_hessian(self, x)
        }
    }
}

/// Negated Rosenbrock function, mode at (1, 1).
#[derive(Debug, Clone, Copy, Default)]
pub struct Rosenbrock;

impl LogDensity for Rosenbrock {
    fn dimension(&self) -> usize {
        2
    }

    fn parameter_names(&self) -> Vec<String> {
        vec!["x".to_string(), "y".to_string()]
    }

    fn log_density(&self, p: &ParameterVector) -> ModelResult<(f64, ParameterVector)> {
        let (x, y) = (p[0], p[1]);
        let a = 1.0 - x;
        let b = y - x * x;
        let value = -(a * a + 100.0 * b * b);
        let grad = ParameterVector::from_vec(vec![2.0 * a + 400.0 * x * b, -200.0 * b]);
        Ok((value, grad))
    }
}

/// Wraps a model and fails wherever `x[0]` is below a threshold.
#[derive(Debug, Clone)]
pub struct FailBelow<M> {
    inner: M,
    threshold: f64,
}

impl<M> FailBelow<M> {
    /// Fails whenever the first coordinate is below `threshold`.
    pub fn new(inner: M, threshold: f64) -> Self {
        Self { inner, threshold }
    }
}

impl<M: LogDensity> LogDensity for FailBelow<M> {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn parameter_names(&self) -> Vec<String> {
        self.inner.parameter_names()
    }

    fn log_density(&self, x: &ParameterVector) -> ModelResult<(f64, ParameterVector)> {
        if x[0] < self.threshold {
            return Err(ModelError::evaluation(format!(
                "x[0] = {} is outside the support",
                x[0]
            )));
        }
        self.inner.log_density(x)
    }

    fn hessian(&self, x: &ParameterVector) -> ModelResult<ParameterMatrix> {
        if x[0] < self.threshold {
            return Err(ModelError::evaluation("Hessian outside the support"));
        }
        self.inner.hessian(x)
    }
}

/// Wraps a model and counts `log_density` calls.
#[derive(Debug)]
pub struct CountingModel<M> {
    inner: M,
    evaluations: Cell<usize>,
}

impl<M> CountingModel<M> {
    /// Wraps `inner` with a zeroed counter.
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            evaluations: Cell::new(0),
        }
    }

    /// Number of `log_density` calls so far.
    pub fn evaluations(&self) -> usize {
        self.evaluations.get()
    }
}

impl<M: LogDensity> LogDensity for CountingModel<M> {
    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn parameter_names(&self) -> Vec<String> {
        self.inner.parameter_names()
    }

    fn log_density(&self, x: &ParameterVector) -> ModelResult<(f64, ParameterVector)> {
        self.evaluations.set(self.evaluations.get() + 1);
        self.inner.log_density(x)
    }

    fn hessian(&self, x: &ParameterVector) -> ModelResult<ParameterMatrix> {
        self.inner.hessian(x)
    }
}

/// Requests cancellation on the `n`-th poll (1-based).
#[derive(Debug, Clone)]
pub struct InterruptAfter {
    remaining: usize,
    polls: usize,
}

impl InterruptAfter {
    /// Interrupts on poll `n`.
    pub fn new(n: usize) -> Self {
        Self {
            remaining: n,
            polls: 0,
        }
    }

    /// Number of polls so far.
    pub fn polls(&self) -> usize {
        self.polls
    }
}

impl Interrupt for InterruptAfter {
    fn interrupted(&mut self) -> bool {
        self.polls += 1;
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }
}
