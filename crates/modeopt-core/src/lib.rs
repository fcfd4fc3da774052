//! Core traits and types for log-density point estimation.
//!
//! This crate defines everything the optimizers in `modeopt-optim` share:
//! the model interface, configuration, convergence tolerances, terminal
//! statuses and the output channels a run writes to.
//!
//! # Key Concepts
//!
//! - **Model**: a differentiable log density over a continuous parameter
//!   vector; the optimizers look for a local maximum (MAP/MLE estimate)
//! - **Convergence policy**: named tolerances deciding when a run stops
//! - **Sinks**: output, info, error and interrupt channels, so no driver is
//!   coupled to a particular output medium
//!
//! # Modules
//!
//! - [`config`]: Run configuration and algorithm selection
//! - [`error`]: Error types
//! - [`model`]: Model trait and finite-difference Hessian
//! - [`policy`]: Convergence tolerances
//! - [`sinks`]: Output channels and cancellation hooks
//! - [`status`]: Terminal statuses
//! - [`types`]: Type aliases and numerical constants

pub mod config;
pub mod error;
pub mod model;
pub mod policy;
pub mod sinks;
pub mod status;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export commonly used items at the crate root
pub use error::{ConfigError, ModelError, ModelResult, OptimizeError, Result};

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use modeopt_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{
        Algorithm, AlgorithmConfig, NewtonConfig, OptimizeArgs, OptimizeConfig,
    };
    pub use crate::error::{ConfigError, ModelError, ModelResult, OptimizeError, Result};
    pub use crate::model::{checked_log_density, finite_difference_hessian, LogDensity};
    pub use crate::policy::ConvergencePolicy;
    pub use crate::sinks::{
        Interrupt, InterruptFlag, IterationRecord, LogWriter, MemoryWriter, MessageWriter,
        NoInterrupt, NullWriter, OutputWriter, Sinks,
    };
    pub use crate::status::TerminationStatus;
    pub use crate::types::{constants, ParameterMatrix, ParameterVector};
}
