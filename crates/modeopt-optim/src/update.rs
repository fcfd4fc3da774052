//! Curvature models for the quasi-Newton steppers.
//!
//! Both models approximate the inverse Hessian of the minimized objective
//! from pairs of successive differences
//!
//! - s_k = x_{k+1} - x_k (parameter step)
//! - y_k = ∇f(x_{k+1}) - ∇f(x_k) (gradient change)
//!
//! and turn a gradient into a search direction `-H ∇f`. Pairs with
//! non-positive curvature `sᵀy` are skipped so that H stays positive
//! definite.

use modeopt_core::types::{ParameterMatrix, ParameterVector};
use std::collections::VecDeque;
use std::fmt::Debug;

/// An inverse-Hessian approximation driven by (s, y) pairs.
pub trait QuasiNewtonUpdate: Debug {
    /// Incorporates a new pair.
    ///
    /// With `reset` set, all accumulated curvature is discarded first and
    /// the initial approximation is rescaled from this pair. Returns the
    /// scale factor `yᵀy / sᵀy` applied on reset, 1 otherwise.
    fn update(&mut self, y: &ParameterVector, s: &ParameterVector, reset: bool) -> f64;

    /// Search direction `-H g` for gradient `g`.
    fn search_direction(&self, gradient: &ParameterVector) -> ParameterVector;

    /// Discards all accumulated curvature.
    fn clear(&mut self);
}

/// Returns `sᵀy` and `yᵀy` when the pair has usable positive curvature.
fn curvature(y: &ParameterVector, s: &ParameterVector) -> Option<(f64, f64)> {
    let sy = s.dot(y);
    let yy = y.norm_squared();
    if sy > 0.0 && sy.is_finite() && yy > 0.0 && yy.is_finite() {
        Some((sy, yy))
    } else {
        log::debug!("skipping curvature pair with sᵀy = {sy:.3e}");
        None
    }
}

/// Dense BFGS inverse-Hessian update.
///
/// Keeps the full n × n matrix:
///
/// H⁺ = (I - ρ s yᵀ) H (I - ρ y sᵀ) + ρ s sᵀ, ρ = 1 / sᵀy
#[derive(Debug, Clone, Default)]
pub struct BfgsUpdate {
    inverse_hessian: Option<ParameterMatrix>,
}

impl BfgsUpdate {
    /// Starts from the identity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current approximation, if any pair has been accepted.
    pub fn inverse_hessian(&self) -> Option<&ParameterMatrix> {
        self.inverse_hessian.as_ref()
    }
}

impl QuasiNewtonUpdate for BfgsUpdate {
    fn update(&mut self, y: &ParameterVector, s: &ParameterVector, reset: bool) -> f64 {
        if reset {
            self.clear();
        }
        let Some((sy, yy)) = curvature(y, s) else {
            return 1.0;
        };

        let n = s.len();
        let mut scale = 1.0;
        let h = match self.inverse_hessian.take() {
            Some(h) => h,
            None => {
                scale = yy / sy;
                ParameterMatrix::identity(n, n) / scale
            }
        };

        let rho = 1.0 / sy;
        let left = ParameterMatrix::identity(n, n) - (s * y.transpose()) * rho;
        let updated = &left * h * left.transpose() + (s * s.transpose()) * rho;
        self.inverse_hessian = Some(updated);
        scale
    }

    fn search_direction(&self, gradient: &ParameterVector) -> ParameterVector {
        match &self.inverse_hessian {
            Some(h) => -(h * gradient),
            None => -gradient,
        }
    }

    fn clear(&mut self) {
        self.inverse_hessian = None;
    }
}

/// One stored correction pair.
#[derive(Debug, Clone)]
struct CorrectionPair {
    rho: f64,
    s: ParameterVector,
    y: ParameterVector,
}

/// Limited-memory BFGS update.
///
/// Stores at most `history_size` recent pairs and applies the two-loop
/// recursion with initial scaling γ = sᵀy / yᵀy from the newest pair.
#[derive(Debug, Clone)]
pub struct LbfgsUpdate {
    history: VecDeque<CorrectionPair>,
    history_size: usize,
    gamma: f64,
}

impl LbfgsUpdate {
    /// Keeps up to `history_size` pairs.
    ///
    /// With a history size of zero no pairs are kept and directions reduce
    /// to steepest descent scaled by the last accepted γ.
    pub fn new(history_size: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(history_size),
            history_size,
            gamma: 1.0,
        }
    }

    /// Maximum number of stored pairs.
    pub fn history_size(&self) -> usize {
        self.history_size
    }

    /// Number of pairs currently stored.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Returns true if no pair is stored.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

impl QuasiNewtonUpdate for LbfgsUpdate {
    fn update(&mut self, y: &ParameterVector, s: &ParameterVector, reset: bool) -> f64 {
        if reset {
            self.clear();
        }
        let Some((sy, yy)) = curvature(y, s) else {
            return 1.0;
        };

        if self.history_size > 0 {
            if self.history.len() == self.history_size {
                self.history.pop_front();
            }
            self.history.push_back(CorrectionPair {
                rho: 1.0 / sy,
                s: s.clone(),
                y: y.clone(),
            });
        }
        self.gamma = sy / yy;

        if reset {
            yy / sy
        } else {
            1.0
        }
    }

    fn search_direction(&self, gradient: &ParameterVector) -> ParameterVector {
        let mut q = -gradient;

        // First loop: newest to oldest
        let mut alphas = Vec::with_capacity(self.history.len());
        for pair in self.history.iter().rev() {
            let alpha = pair.rho * pair.s.dot(&q);
            q.axpy(-alpha, &pair.y, 1.0);
            alphas.push(alpha);
        }

        q *= self.gamma;

        // Second loop: oldest to newest
        for (pair, alpha) in self.history.iter().zip(alphas.iter().rev()) {
            let beta = pair.rho * pair.y.dot(&q);
            q.axpy(alpha - beta, &pair.s, 1.0);
        }

        q
    }

    fn clear(&mut self) {
        self.history.clear();
        self.gamma = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Pair generated by the quadratic with Hessian `diag(d)`.
    fn pair(d: &[f64], s: &[f64]) -> (ParameterVector, ParameterVector) {
        let s = ParameterVector::from_column_slice(s);
        let y = ParameterVector::from_iterator(s.len(), s.iter().zip(d).map(|(si, di)| si * di));
        (y, s)
    }

    #[test]
    fn test_bfgs_secant_equation() {
        let mut update = BfgsUpdate::new();
        let (y, s) = pair(&[2.0, 5.0], &[0.3, -0.7]);
        update.update(&y, &s, true);

        // H y = s after every update
        let h = update.inverse_hessian().unwrap();
        let hy = h * &y;
        assert_relative_eq!(hy, s, epsilon = 1e-12);
    }

    #[test]
    fn test_bfgs_reset_scale() {
        let mut update = BfgsUpdate::new();
        let (y, s) = pair(&[4.0, 4.0], &[1.0, 1.0]);
        let scale = update.update(&y, &s, true);
        assert_relative_eq!(scale, 4.0, epsilon = 1e-12);

        let (y, s) = pair(&[4.0, 4.0], &[0.5, -0.5]);
        assert_relative_eq!(update.update(&y, &s, false), 1.0);
    }

    #[test]
    fn test_bfgs_skips_negative_curvature() {
        let mut update = BfgsUpdate::new();
        let s = ParameterVector::from_vec(vec![1.0, 0.0]);
        let y = ParameterVector::from_vec(vec![-1.0, 0.0]);
        update.update(&y, &s, true);
        assert!(update.inverse_hessian().is_none());

        let g = ParameterVector::from_vec(vec![1.0, 2.0]);
        assert_eq!(update.search_direction(&g), -g);
    }

    #[test]
    fn test_lbfgs_matches_bfgs_within_history() {
        let d = [1.0, 3.0, 10.0];
        let steps = [[1.0, 0.5, -0.2], [-0.3, 0.8, 0.1]];

        let mut dense = BfgsUpdate::new();
        let mut limited = LbfgsUpdate::new(5);
        for (i, s) in steps.iter().enumerate() {
            let (y, s) = pair(&d, s);
            dense.update(&y, &s, i == 0);
            limited.update(&y, &s, i == 0);
        }

        // With one pair both reduce to the same update of (sᵀy / yᵀy) I
        let g = ParameterVector::from_vec(vec![0.4, -1.0, 2.0]);
        let mut dense_one = BfgsUpdate::new();
        let mut limited_one = LbfgsUpdate::new(5);
        let (y, s) = pair(&d, &steps[0]);
        dense_one.update(&y, &s, true);
        limited_one.update(&y, &s, true);
        assert_relative_eq!(
            dense_one.search_direction(&g),
            limited_one.search_direction(&g),
            epsilon = 1e-10
        );

        assert_eq!(limited.len(), 2);
        assert!(dense.search_direction(&g).dot(&g) < 0.0);
        assert!(limited.search_direction(&g).dot(&g) < 0.0);
    }

    #[test]
    fn test_lbfgs_history_bounded() {
        let mut update = LbfgsUpdate::new(2);
        for k in 0..5 {
            let (y, s) = pair(&[2.0, 3.0], &[1.0 + f64::from(k), 0.5]);
            update.update(&y, &s, k == 0);
        }
        assert_eq!(update.len(), 2);

        let (y, s) = pair(&[2.0, 3.0], &[1.0, 1.0]);
        update.update(&y, &s, true);
        assert_eq!(update.len(), 1);
    }

    #[test]
    fn test_lbfgs_zero_history_is_scaled_steepest_descent() {
        let mut update = LbfgsUpdate::new(0);
        let (y, s) = pair(&[4.0, 4.0], &[1.0, 2.0]);
        update.update(&y, &s, true);
        assert!(update.is_empty());

        let g = ParameterVector::from_vec(vec![1.0, -1.0]);
        assert_relative_eq!(update.search_direction(&g), -0.25 * &g, epsilon = 1e-12);
    }
}
