//! Run configuration.
//!
//! Two layers:
//!
//! - [`OptimizeArgs`] is the flat, loosely typed bundle a front end produces
//!   (option names match the `optimize` method arguments: `algorithm`, `iter`,
//!   `save_iterations`, `refresh`, `init_alpha`, `tol_*`, `history_size`).
//! - [`OptimizeConfig`] is the validated form handed to the drivers. The
//!   algorithm is a tagged union, so each driver only ever sees the settings
//!   that apply to it.
//!
//! # Example
//!
//! ```rust
//! use modeopt_core::config::{AlgorithmConfig, OptimizeArgs};
//!
//! let args = OptimizeArgs {
//!     algorithm: "bfgs".to_string(),
//!     tol_grad: 1e-10,
//!     ..OptimizeArgs::default()
//! };
//! let config = args.resolve().unwrap();
//! assert!(matches!(config.algorithm, AlgorithmConfig::Bfgs(_)));
//! ```

use crate::{error::ConfigError, policy::ConvergencePolicy};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Optimization algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Newton's method with a halving step search
    Newton,
    /// Dense BFGS with a Wolfe line search
    Bfgs,
    /// Limited-memory BFGS with a Wolfe line search
    Lbfgs,
}

impl Algorithm {
    /// Name used in configuration bundles.
    pub fn name(self) -> &'static str {
        match self {
            Self::Newton => "newton",
            Self::Bfgs => "bfgs",
            Self::Lbfgs => "lbfgs",
        }
    }
}

impl FromStr for Algorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "newton" => Ok(Self::Newton),
            "bfgs" => Ok(Self::Bfgs),
            "lbfgs" => Ok(Self::Lbfgs),
            other => Err(ConfigError::UnknownAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Settings for the Newton driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewtonConfig {
    /// Maximum number of Newton steps
    pub max_iterations: usize,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: ConvergencePolicy::default().max_iterations,
        }
    }
}

/// Algorithm-specific configuration, resolved once by the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub enum AlgorithmConfig {
    /// Newton's method
    Newton(NewtonConfig),
    /// Dense BFGS; `history_size` is ignored
    Bfgs(ConvergencePolicy),
    /// L-BFGS
    Lbfgs(ConvergencePolicy),
}

impl AlgorithmConfig {
    /// The selector this configuration belongs to.
    pub fn algorithm(&self) -> Algorithm {
        match self {
            Self::Newton(_) => Algorithm::Newton,
            Self::Bfgs(_) => Algorithm::Bfgs,
            Self::Lbfgs(_) => Algorithm::Lbfgs,
        }
    }

    /// Checks the embedded settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Newton(newton) if newton.max_iterations == 0 => Err(ConfigError::invalid_option(
                "iter",
                newton.max_iterations,
                "must be a positive integer",
            )),
            Self::Newton(_) => Ok(()),
            Self::Bfgs(policy) => policy.validate(),
            Self::Lbfgs(policy) => {
                policy.validate()?;
                policy.validate_history_size()
            }
        }
    }
}

/// Validated configuration of one optimization run.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeConfig {
    /// Algorithm and its settings
    pub algorithm: AlgorithmConfig,
    /// Emit an iteration record for every iterate
    pub save_iterations: bool,
    /// Progress report cadence in iterations; 0 disables reports
    pub refresh: usize,
}

impl OptimizeConfig {
    /// Creates a configuration for the given algorithm settings.
    pub fn new(algorithm: AlgorithmConfig) -> Self {
        Self {
            algorithm,
            save_iterations: false,
            refresh: 100,
        }
    }

    /// Newton's method with default settings.
    pub fn newton() -> Self {
        Self::new(AlgorithmConfig::Newton(NewtonConfig::default()))
    }

    /// BFGS with the given policy.
    pub fn bfgs(policy: ConvergencePolicy) -> Self {
        Self::new(AlgorithmConfig::Bfgs(policy))
    }

    /// L-BFGS with the given policy.
    pub fn lbfgs(policy: ConvergencePolicy) -> Self {
        Self::new(AlgorithmConfig::Lbfgs(policy))
    }

    /// Enables or disables per-iteration records.
    pub fn with_save_iterations(mut self, save: bool) -> Self {
        self.save_iterations = save;
        self
    }

    /// Sets the progress report cadence.
    pub fn with_refresh(mut self, refresh: usize) -> Self {
        self.refresh = refresh;
        self
    }
}

/// Flat configuration bundle as produced by a front end.
///
/// Every option has a default, so a front end only needs to fill in what the
/// user supplied.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OptimizeArgs {
    /// One of `newton`, `bfgs`, `lbfgs`
    pub algorithm: String,
    /// Maximum number of iterations
    pub iter: usize,
    /// Emit an iteration record for every iterate
    pub save_iterations: bool,
    /// Progress report cadence; 0 disables reports
    pub refresh: usize,
    /// First trial step length of the line search
    pub init_alpha: f64,
    /// Absolute objective tolerance
    pub tol_obj: f64,
    /// Relative objective tolerance
    pub tol_rel_obj: f64,
    /// Absolute gradient tolerance
    pub tol_grad: f64,
    /// Relative gradient tolerance
    pub tol_rel_grad: f64,
    /// Absolute parameter tolerance
    pub tol_param: f64,
    /// L-BFGS history size
    pub history_size: usize,
}

impl Default for OptimizeArgs {
    fn default() -> Self {
        let policy = ConvergencePolicy::default();
        Self {
            algorithm: Algorithm::Lbfgs.name().to_string(),
            iter: policy.max_iterations,
            save_iterations: false,
            refresh: 100,
            init_alpha: policy.init_alpha,
            tol_obj: policy.tol_obj,
            tol_rel_obj: policy.tol_rel_obj,
            tol_grad: policy.tol_grad,
            tol_rel_grad: policy.tol_rel_grad,
            tol_param: policy.tol_param,
            history_size: policy.history_size,
        }
    }
}

impl OptimizeArgs {
    /// Binds the numeric options into a convergence policy.
    pub fn policy(&self) -> ConvergencePolicy {
        ConvergencePolicy {
            max_iterations: self.iter,
            tol_obj: self.tol_obj,
            tol_rel_obj: self.tol_rel_obj,
            tol_grad: self.tol_grad,
            tol_rel_grad: self.tol_rel_grad,
            tol_param: self.tol_param,
            init_alpha: self.init_alpha,
            history_size: self.history_size,
        }
    }

    /// Validates the numeric options.
    ///
    /// The algorithm name is checked separately by [`OptimizeArgs::resolve`]
    /// so that an unknown name can be reported as a usage status rather than
    /// a malformed bundle. `history_size` is only checked for `lbfgs`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let policy = self.policy();
        policy.validate()?;
        if self.algorithm.parse::<Algorithm>().ok() == Some(Algorithm::Lbfgs) {
            policy.validate_history_size()?;
        }
        Ok(())
    }

    /// Resolves the bundle into a typed configuration.
    pub fn resolve(&self) -> Result<OptimizeConfig, ConfigError> {
        self.validate()?;
        let algorithm = match self.algorithm.parse::<Algorithm>()? {
            Algorithm::Newton => AlgorithmConfig::Newton(NewtonConfig {
                max_iterations: self.iter,
            }),
            Algorithm::Bfgs => AlgorithmConfig::Bfgs(self.policy()),
            Algorithm::Lbfgs => AlgorithmConfig::Lbfgs(self.policy()),
        };
        Ok(OptimizeConfig {
            algorithm,
            save_iterations: self.save_iterations,
            refresh: self.refresh,
        })
    }
}
