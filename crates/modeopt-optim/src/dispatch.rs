//! Entry points selecting and running an optimization algorithm.
//!
//! Two entry points share one dispatch path:
//!
//! - [`run`] takes the flat [`OptimizeArgs`] bundle a front end produces
//!   and returns the terminal status. An unknown algorithm name is reported
//!   on the error sink and yields [`TerminationStatus::UsageError`].
//! - [`optimize`] takes a typed [`OptimizeConfig`] and returns the full
//!   [`OptimizeReport`].
//!
//! Both write the header (`lp__` followed by the parameter names) exactly
//! once before any record.

use crate::driver::QuasiNewtonDriver;
use crate::newton::NewtonDriver;
use crate::report::OptimizeReport;
use crate::stepper::{Bfgs, Lbfgs};
use crate::update::{BfgsUpdate, LbfgsUpdate};
use log::{debug, info};
use modeopt_core::{
    config::{AlgorithmConfig, OptimizeArgs, OptimizeConfig},
    error::{ConfigError, OptimizeError, Result},
    model::LogDensity,
    sinks::Sinks,
    status::TerminationStatus,
    types::{constants::LOG_DENSITY_NAME, ParameterVector},
};

/// Runs the algorithm named in `args` from `initial`.
///
/// # Errors
///
/// Returns an error if a numeric option is out of range or the initial
/// point does not fit the model. An unknown algorithm name is not an
/// error: it is reported on the error sink and the run returns
/// [`TerminationStatus::UsageError`] without evaluating the model.
pub fn run<M>(
    model: &M,
    args: &OptimizeArgs,
    initial: ParameterVector,
    sinks: &mut Sinks<'_>,
) -> Result<TerminationStatus>
where
    M: LogDensity + ?Sized,
{
    args.validate()?;
    check_initial_point(model, &initial)?;
    write_header(model, sinks);

    let config = match args.resolve() {
        Ok(config) => config,
        Err(err @ ConfigError::UnknownAlgorithm(_)) => {
            sinks.error(&err.to_string());
            return Ok(TerminationStatus::UsageError);
        }
        Err(err) => return Err(err.into()),
    };

    Ok(dispatch(model, &config, initial, sinks).status)
}

/// Runs the configured algorithm from `initial`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the initial point
/// does not fit the model.
pub fn optimize<M>(
    model: &M,
    config: &OptimizeConfig,
    initial: ParameterVector,
    sinks: &mut Sinks<'_>,
) -> Result<OptimizeReport>
where
    M: LogDensity + ?Sized,
{
    config.algorithm.validate()?;
    check_initial_point(model, &initial)?;
    write_header(model, sinks);
    Ok(dispatch(model, config, initial, sinks))
}

fn check_initial_point<M>(model: &M, initial: &ParameterVector) -> Result<()>
where
    M: LogDensity + ?Sized,
{
    let expected = model.dimension();
    if initial.len() != expected {
        return Err(OptimizeError::DimensionMismatch {
            expected,
            actual: initial.len(),
        });
    }
    if let Some(index) = initial.iter().position(|x| !x.is_finite()) {
        return Err(OptimizeError::NonFiniteInitialPoint { index });
    }
    Ok(())
}

fn write_header<M>(model: &M, sinks: &mut Sinks<'_>)
where
    M: LogDensity + ?Sized,
{
    let names: Vec<String> = std::iter::once(LOG_DENSITY_NAME.to_string())
        .chain(model.parameter_names())
        .collect();
    sinks.header(&names);
}

fn dispatch<M>(
    model: &M,
    config: &OptimizeConfig,
    initial: ParameterVector,
    sinks: &mut Sinks<'_>,
) -> OptimizeReport
where
    M: LogDensity + ?Sized,
{
    debug!(
        "dispatching {} on {} parameters",
        config.algorithm.algorithm(),
        initial.len()
    );

    let report = match &config.algorithm {
        AlgorithmConfig::Newton(newton) => NewtonDriver::new(model, newton.clone())
            .with_save_iterations(config.save_iterations)
            .run(initial, sinks),
        AlgorithmConfig::Bfgs(policy) => {
            let stepper = Bfgs::new(model, initial, BfgsUpdate::new()).with_policy(policy.clone());
            QuasiNewtonDriver::new(stepper)
                .with_save_iterations(config.save_iterations)
                .with_refresh(config.refresh)
                .run(sinks)
        }
        AlgorithmConfig::Lbfgs(policy) => {
            let update = LbfgsUpdate::new(policy.history_size);
            let stepper = Lbfgs::new(model, initial, update).with_policy(policy.clone());
            QuasiNewtonDriver::new(stepper)
                .with_save_iterations(config.save_iterations)
                .with_refresh(config.refresh)
                .run(sinks)
        }
    };

    info!(target: "modeopt", "{} finished: {report}", config.algorithm.algorithm());
    report
}
