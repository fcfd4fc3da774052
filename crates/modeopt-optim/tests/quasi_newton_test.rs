//! Integration tests for the BFGS and L-BFGS drivers.

use approx::assert_relative_eq;
use modeopt_core::test_utils::{ConcaveQuadratic, FailBelow, InterruptAfter, Rosenbrock};
use modeopt_optim::driver::PROGRESS_HEADER;
use modeopt_optim::prelude::*;

#[derive(Debug, Default)]
struct Capture {
    output: MemoryWriter,
    info: Vec<String>,
    error: Vec<String>,
}

fn optimize_with<M: LogDensity, I: Interrupt>(
    model: &M,
    config: &OptimizeConfig,
    initial: ParameterVector,
    interrupt: &mut I,
) -> (OptimizeReport, Capture) {
    let mut capture = Capture::default();
    let report = {
        let mut sinks = Sinks::new(
            &mut capture.output,
            &mut capture.info,
            &mut capture.error,
            interrupt,
        );
        optimize(model, config, initial, &mut sinks).unwrap()
    };
    (report, capture)
}

fn quasi_newton_configs() -> Vec<OptimizeConfig> {
    vec![
        OptimizeConfig::bfgs(ConvergencePolicy::default()),
        OptimizeConfig::lbfgs(ConvergencePolicy::default()),
    ]
}

#[test]
fn test_quadratic_mode() {
    let center = ParameterVector::from_vec(vec![2.0, -1.0, 0.5, 4.0]);
    let weights = ParameterVector::from_vec(vec![1.0, 10.0, 0.1, 3.0]);
    let model = ConcaveQuadratic::new(center.clone()).with_weights(weights);

    for config in quasi_newton_configs() {
        let (report, _) =
            optimize_with(&model, &config, ParameterVector::zeros(4), &mut NoInterrupt);

        assert!(report.converged(), "{:?}: {}", config.algorithm, report);
        assert_relative_eq!(report.parameters, center, epsilon = 1e-3);
    }
}

#[test]
fn test_rosenbrock_mode() {
    let policy = ConvergencePolicy::default().with_objective_tolerances(1e-14, 1e2);
    for config in [OptimizeConfig::bfgs(policy.clone()), OptimizeConfig::lbfgs(policy)] {
        let (report, _) = optimize_with(
            &Rosenbrock,
            &config,
            ParameterVector::from_vec(vec![-1.2, 1.0]),
            &mut NoInterrupt,
        );

        assert!(report.converged(), "{:?}: {}", config.algorithm, report);
        assert_relative_eq!(report.parameters[0], 1.0, epsilon = 1e-3);
        assert_relative_eq!(report.parameters[1], 1.0, epsilon = 1e-3);
    }
}

#[test]
fn test_records_start_at_one() {
    for config in quasi_newton_configs() {
        let config = config.with_save_iterations(true);
        let (report, capture) = optimize_with(
            &Rosenbrock,
            &config,
            ParameterVector::from_vec(vec![-1.2, 1.0]),
            &mut NoInterrupt,
        );

        let indices: Vec<usize> = capture.output.records.iter().map(|r| r.index).collect();
        let expected: Vec<usize> = (1..=report.iterations).collect();
        assert_eq!(indices, expected);
        assert_eq!(capture.output.headers.len(), 1);

        for pair in capture.output.records.windows(2) {
            assert!(pair[1].log_density >= pair[0].log_density);
        }
    }
}

#[test]
fn test_interrupt_after_k_advances() {
    for config in quasi_newton_configs() {
        let mut interrupt = InterruptAfter::new(4);
        let (report, capture) = optimize_with(
            &Rosenbrock,
            &config,
            ParameterVector::from_vec(vec![-1.2, 1.0]),
            &mut interrupt,
        );

        assert_eq!(report.status, TerminationStatus::Interrupted);
        assert_eq!(report.iterations, 4);
        assert_eq!(interrupt.polls(), 4);
        assert_eq!(capture.output.records.len(), 1);
    }
}

#[test]
fn test_iteration_cap() {
    let policy = ConvergencePolicy::default().with_max_iterations(5);
    let (report, _) = optimize_with(
        &Rosenbrock,
        &OptimizeConfig::lbfgs(policy),
        ParameterVector::from_vec(vec![-1.2, 1.0]),
        &mut NoInterrupt,
    );

    assert_eq!(report.status, TerminationStatus::MaxIterations);
    assert_eq!(report.iterations, 5);
}

#[test]
fn test_unevaluable_initial_point_is_line_search_failure() {
    let model = FailBelow::new(ConcaveQuadratic::new(ParameterVector::zeros(1)), 0.0);
    let (report, capture) = optimize_with(
        &model,
        &OptimizeConfig::lbfgs(ConvergencePolicy::default()),
        ParameterVector::from_element(1, -2.0),
        &mut NoInterrupt,
    );

    assert_eq!(report.status, TerminationStatus::LineSearchFailed);
    assert_eq!(report.log_density, f64::NEG_INFINITY);
    assert!(capture.info[0].contains("outside the support"));
    assert!(capture
        .info
        .iter()
        .any(|m| m == "Optimization terminated with error:"));
}

#[test]
fn test_progress_reports() {
    let config = OptimizeConfig::lbfgs(ConvergencePolicy::default()).with_refresh(1);
    let (report, capture) = optimize_with(
        &Rosenbrock,
        &config,
        ParameterVector::from_vec(vec![-1.2, 1.0]),
        &mut NoInterrupt,
    );

    let headers = capture
        .info
        .iter()
        .filter(|m| m.as_str() == PROGRESS_HEADER)
        .count();
    assert_eq!(headers, report.iterations);
    assert!(capture
        .info
        .iter()
        .any(|m| m == "Optimization terminated normally:"));
    assert!(capture.error.is_empty());
}

#[test]
fn test_refresh_zero_is_silent() {
    let config = OptimizeConfig::bfgs(ConvergencePolicy::default()).with_refresh(0);
    let model = ConcaveQuadratic::new(ParameterVector::from_element(2, 1.0));
    let (_, capture) = optimize_with(&model, &config, ParameterVector::zeros(2), &mut NoInterrupt);

    assert!(!capture.info.iter().any(|m| m == PROGRESS_HEADER));
}
