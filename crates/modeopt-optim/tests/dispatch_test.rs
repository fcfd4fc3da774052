//! Integration tests for the flat-argument entry point.

use approx::assert_relative_eq;
use modeopt_core::test_utils::{ConcaveQuadratic, CountingModel};
use modeopt_optim::prelude::*;
use pretty_assertions::assert_eq;

#[derive(Debug, Default)]
struct Capture {
    output: MemoryWriter,
    info: Vec<String>,
    error: Vec<String>,
}

fn run_args<M: LogDensity>(
    model: &M,
    args: &OptimizeArgs,
    initial: ParameterVector,
) -> (Result<TerminationStatus>, Capture) {
    let mut capture = Capture::default();
    let mut interrupt = NoInterrupt;
    let status = {
        let mut sinks = Sinks::new(
            &mut capture.output,
            &mut capture.info,
            &mut capture.error,
            &mut interrupt,
        );
        run(model, args, initial, &mut sinks)
    };
    (status, capture)
}

fn args_for(algorithm: &str) -> OptimizeArgs {
    OptimizeArgs {
        algorithm: algorithm.to_string(),
        ..OptimizeArgs::default()
    }
}

#[test]
fn test_every_algorithm_finds_the_mode() {
    let model = ConcaveQuadratic::new(ParameterVector::from_element(1, 3.0));
    for algorithm in ["newton", "bfgs", "lbfgs"] {
        let (status, capture) = run_args(&model, &args_for(algorithm), ParameterVector::zeros(1));
        let status = status.unwrap();

        assert!(status.is_converged(), "{algorithm}: {status}");
        let last = capture.output.last().unwrap();
        assert_relative_eq!(last.parameters[0], 3.0, epsilon = 1e-4);
        assert!(last.index <= 5, "{algorithm} took {} iterations", last.index);
    }
}

#[test]
fn test_header_written_once() {
    let model = ConcaveQuadratic::new(ParameterVector::zeros(2));
    for algorithm in ["newton", "bfgs", "lbfgs", "simplex"] {
        let args = OptimizeArgs {
            save_iterations: true,
            ..args_for(algorithm)
        };
        let (_, capture) = run_args(&model, &args, ParameterVector::from_element(2, 1.0));

        assert_eq!(
            capture.output.headers,
            vec![vec![
                "lp__".to_string(),
                "theta.1".to_string(),
                "theta.2".to_string()
            ]]
        );
    }
}

#[test]
fn test_repeated_runs_write_one_header_each() {
    let model = ConcaveQuadratic::new(ParameterVector::from_element(2, 0.5));
    for algorithm in ["newton", "bfgs", "lbfgs", "simplex"] {
        let args = args_for(algorithm);
        assert!(!args.save_iterations);

        let mut capture = Capture::default();
        let mut interrupt = NoInterrupt;
        {
            let mut sinks = Sinks::new(
                &mut capture.output,
                &mut capture.info,
                &mut capture.error,
                &mut interrupt,
            );
            for _ in 0..2 {
                run(&model, &args, ParameterVector::zeros(2), &mut sinks).unwrap();
            }
        }

        assert_eq!(capture.output.headers.len(), 2, "{algorithm}");
        let expected_records = if algorithm == "simplex" { 0 } else { 2 };
        assert_eq!(capture.output.records.len(), expected_records, "{algorithm}");
    }
}

#[test]
fn test_unknown_algorithm_skips_the_model() {
    let model = CountingModel::new(ConcaveQuadratic::new(ParameterVector::zeros(1)));
    let (status, capture) = run_args(&model, &args_for("simplex"), ParameterVector::zeros(1));

    assert_eq!(status.unwrap(), TerminationStatus::UsageError);
    assert_eq!(model.evaluations(), 0);
    assert_eq!(capture.error.len(), 1);
    assert!(capture.output.records.is_empty());
    assert_eq!(TerminationStatus::UsageError.exit_code(), 64);
}

#[test]
fn test_defaults_select_lbfgs() {
    let args: OptimizeArgs = serde_json::from_str(r#"{ "iter": 50 }"#).unwrap();
    assert_eq!(args.algorithm, "lbfgs");

    let model = ConcaveQuadratic::new(ParameterVector::from_element(3, -1.0));
    let (status, capture) = run_args(&model, &args, ParameterVector::zeros(3));

    assert!(status.unwrap().is_converged());
    assert!(capture
        .info
        .iter()
        .any(|m| m == "Optimization terminated normally:"));
}

#[test]
fn test_history_size_is_validated() {
    let args = OptimizeArgs {
        history_size: 0,
        ..args_for("lbfgs")
    };
    let model = ConcaveQuadratic::new(ParameterVector::zeros(1));
    let (status, capture) = run_args(&model, &args, ParameterVector::zeros(1));

    assert!(matches!(
        status,
        Err(OptimizeError::Config(ConfigError::InvalidOption { .. }))
    ));
    assert!(capture.output.headers.is_empty());
}

#[test]
fn test_history_size_ignored_by_bfgs() {
    let args = OptimizeArgs {
        history_size: 0,
        ..args_for("bfgs")
    };
    let model = ConcaveQuadratic::new(ParameterVector::from_element(1, 2.0));
    let (status, capture) = run_args(&model, &args, ParameterVector::zeros(1));

    assert!(status.unwrap().is_converged());
    assert_eq!(capture.output.headers.len(), 1);
}
