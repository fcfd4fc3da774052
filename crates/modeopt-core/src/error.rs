//! Error types for model evaluation and run configuration.
//!
//! Model failures are recoverable: drivers collapse them to a log density of
//! −∞ and keep going. Configuration and input errors are not, and abort a run
//! before the first iteration.

use thiserror::Error;

/// Errors raised while evaluating a model's log density.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// The model itself reported a failure.
    ///
    /// This covers domain violations, failed numerical sub-problems and any
    /// other condition under which the density cannot be computed.
    #[error("Error evaluating model log probability: {message}")]
    Evaluation {
        /// Description supplied by the model
        message: String,
    },

    /// The model returned a value or gradient that is not finite.
    #[error("Error evaluating model log probability: Non-finite {quantity}.")]
    NonFinite {
        /// Which quantity was not finite ("function evaluation" or "gradient")
        quantity: String,
    },

    /// The model returned a gradient or Hessian of the wrong size.
    #[error("Error evaluating model log probability: expected {expected} values, got {actual}")]
    DimensionMismatch {
        /// Model dimension
        expected: usize,
        /// Length actually returned
        actual: usize,
    },
}

impl ModelError {
    /// Create an Evaluation error with a custom message.
    pub fn evaluation<S: Into<String>>(message: S) -> Self {
        Self::Evaluation {
            message: message.into(),
        }
    }

    /// Create a NonFinite error for a non-finite log density.
    pub fn non_finite_value() -> Self {
        Self::NonFinite {
            quantity: "function evaluation".to_string(),
        }
    }

    /// Create a NonFinite error for a non-finite gradient.
    pub fn non_finite_gradient() -> Self {
        Self::NonFinite {
            quantity: "gradient".to_string(),
        }
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }
}

/// Errors in the configuration bundle handed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A numeric option is outside its admissible range.
    #[error("Invalid value for option '{option}': {value} ({reason})")]
    InvalidOption {
        /// Option name as it appears in the configuration
        option: String,
        /// Offending value, rendered as text
        value: String,
        /// Admissible range
        reason: String,
    },

    /// The algorithm name is not one of `newton`, `bfgs`, `lbfgs`.
    #[error("Unknown optimization algorithm '{0}' (expected newton, bfgs or lbfgs)")]
    UnknownAlgorithm(String),
}

impl ConfigError {
    /// Create an InvalidOption error.
    pub fn invalid_option<S1, V, S2>(option: S1, value: V, reason: S2) -> Self
    where
        S1: Into<String>,
        V: std::fmt::Display,
        S2: Into<String>,
    {
        Self::InvalidOption {
            option: option.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors that prevent an optimization run from starting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizeError {
    /// Malformed configuration bundle.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The initial point does not match the model dimension.
    #[error("Initial point has {actual} parameters but the model has {expected}")]
    DimensionMismatch {
        /// Model dimension
        expected: usize,
        /// Length of the initial point
        actual: usize,
    },

    /// The initial point contains NaN or an infinity.
    #[error("Initial point is not finite at index {index}")]
    NonFiniteInitialPoint {
        /// Index of the first offending entry
        index: usize,
    },
}

/// Result type alias for model evaluations.
pub type ModelResult<T> = std::result::Result<T, ModelError>;

/// Result type alias for optimizer entry points.
pub type Result<T> = std::result::Result<T, OptimizeError>;
