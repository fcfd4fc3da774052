//! Optimization algorithms for log-density point estimation.
//!
//! This crate finds a local maximum of a model's log density (a MAP or
//! maximum-likelihood estimate) with one of three algorithms:
//!
//! - **Newton**: eigenvalue-corrected Newton steps with step halving
//! - **BFGS**: dense quasi-Newton with a strong Wolfe line search
//! - **L-BFGS**: limited-memory quasi-Newton with the same line search
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use modeopt_optim::prelude::*;
//!
//! let mut output = MemoryWriter::new();
//! let mut info = LogWriter::info();
//! let mut error = LogWriter::error();
//! let mut interrupt = NoInterrupt;
//! let mut sinks = Sinks::new(&mut output, &mut info, &mut error, &mut interrupt);
//!
//! let config = OptimizeConfig::lbfgs(ConvergencePolicy::default());
//! let report = optimize(&model, &config, initial, &mut sinks)?;
//! println!("{report}");
//! ```
//!
//! # Modules
//!
//! - [`dispatch`]: Entry points selecting the algorithm
//! - [`driver`]: Quasi-Newton driver loop and progress reports
//! - [`line_search`]: Strong Wolfe line search
//! - [`newton`]: Newton step and driver
//! - [`stepper`]: Quasi-Newton steppers
//! - [`update`]: BFGS and L-BFGS curvature models

pub mod dispatch;
pub mod driver;
pub mod line_search;
pub mod newton;
pub mod report;
pub mod stepper;
pub mod update;

pub use dispatch::{optimize, run};
pub use driver::QuasiNewtonDriver;
pub use line_search::{LineSearchError, LineSearchParams};
pub use newton::{newton_step, NewtonDriver};
pub use report::OptimizeReport;
pub use stepper::{Bfgs, BfgsLineSearch, Lbfgs, StepOutcome, StepProgress, Stepper};
pub use update::{BfgsUpdate, LbfgsUpdate, QuasiNewtonUpdate};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        optimize, run, Bfgs, BfgsUpdate, Lbfgs, LbfgsUpdate, NewtonDriver, OptimizeReport,
        QuasiNewtonDriver, StepOutcome, Stepper,
    };
    pub use modeopt_core::prelude::*;
}
