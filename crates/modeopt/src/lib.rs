//! # modeopt
//!
//! Point estimation (MAP or maximum likelihood) for differentiable log
//! densities with Newton's method, BFGS and L-BFGS.
//!
//! This crate re-exports the workspace:
//!
//! - [`core`]: model trait, configuration, statuses and output sinks
//! - [`optim`]: the algorithms and the dispatching entry points
//! - [`nalgebra`]: the linear algebra crate behind the parameter vectors
//!
//! ## Example
//!
//! ```rust
//! use modeopt::prelude::*;
//!
//! /// -(x - 3)²
//! #[derive(Debug)]
//! struct Shifted;
//!
//! impl LogDensity for Shifted {
//!     fn dimension(&self) -> usize {
//!         1
//!     }
//!
//!     fn log_density(&self, x: &ParameterVector) -> ModelResult<(f64, ParameterVector)> {
//!         let d = x[0] - 3.0;
//!         Ok((-d * d, ParameterVector::from_element(1, -2.0 * d)))
//!     }
//! }
//!
//! let mut output = MemoryWriter::new();
//! let mut info: Vec<String> = Vec::new();
//! let mut error: Vec<String> = Vec::new();
//! let mut interrupt = NoInterrupt;
//! let mut sinks = Sinks::new(&mut output, &mut info, &mut error, &mut interrupt);
//!
//! let args = OptimizeArgs {
//!     algorithm: "newton".to_string(),
//!     ..OptimizeArgs::default()
//! };
//! let status = run(&Shifted, &args, ParameterVector::zeros(1), &mut sinks).unwrap();
//!
//! assert_eq!(status, TerminationStatus::Ok);
//! assert!((output.last().unwrap().parameters[0] - 3.0).abs() < 1e-6);
//! ```

pub use modeopt_core as core;
pub use modeopt_optim as optim;

// Re-export key dependencies
pub use nalgebra;

pub use modeopt_core::{ConfigError, ModelError, ModelResult, OptimizeError, Result};
pub use modeopt_optim::{optimize, run, OptimizeReport};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use modeopt_optim::prelude::*;
}
