//! End-to-end runs through the facade crate.

use approx::assert_relative_eq;
use modeopt::prelude::*;
use modeopt_core::test_utils::Rosenbrock;

/// Normal log likelihood in (mu, log sigma) for a fixed sample.
#[derive(Debug)]
struct NormalLikelihood {
    data: Vec<f64>,
}

impl LogDensity for NormalLikelihood {
    fn dimension(&self) -> usize {
        2
    }

    fn parameter_names(&self) -> Vec<String> {
        vec!["mu".to_string(), "log_sigma".to_string()]
    }

    fn log_density(&self, p: &ParameterVector) -> ModelResult<(f64, ParameterVector)> {
        let (mu, log_sigma) = (p[0], p[1]);
        let precision = (-2.0 * log_sigma).exp();
        let n = self.data.len() as f64;
        let ss: f64 = self.data.iter().map(|x| (x - mu).powi(2)).sum();
        let sum: f64 = self.data.iter().map(|x| x - mu).sum();

        let value = -n * log_sigma - 0.5 * precision * ss;
        let grad = ParameterVector::from_vec(vec![precision * sum, -n + precision * ss]);
        Ok((value, grad))
    }
}

#[test]
fn test_normal_mle_all_algorithms() {
    let data = vec![1.2, 0.7, 2.5, 1.9, 0.4, 1.1, 1.6];
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let model = NormalLikelihood { data };

    for algorithm in ["newton", "bfgs", "lbfgs"] {
        let mut output = MemoryWriter::new();
        let mut info: Vec<String> = Vec::new();
        let mut error: Vec<String> = Vec::new();
        let mut interrupt = NoInterrupt;
        let mut sinks = Sinks::new(&mut output, &mut info, &mut error, &mut interrupt);

        let args = OptimizeArgs {
            algorithm: algorithm.to_string(),
            ..OptimizeArgs::default()
        };
        let status = run(&model, &args, ParameterVector::zeros(2), &mut sinks).unwrap();
        assert!(status.is_converged(), "{algorithm}: {status}");

        assert_eq!(output.headers[0], vec!["lp__", "mu", "log_sigma"]);
        let estimate = &output.last().unwrap().parameters;
        assert_relative_eq!(estimate[0], mean, epsilon = 1e-3);
        assert_relative_eq!(estimate[1], 0.5 * variance.ln(), epsilon = 1e-3);
    }
}

#[test]
fn test_shared_interrupt_flag() {
    let flag = InterruptFlag::new();
    flag.request();

    let mut output = MemoryWriter::new();
    let mut info = LogWriter::info();
    let mut error = LogWriter::error();
    let mut interrupt = flag.clone();
    let mut sinks = Sinks::new(&mut output, &mut info, &mut error, &mut interrupt);

    let initial = modeopt::nalgebra::DVector::from_vec(vec![-1.2, 1.0]);
    let report = optimize(
        &Rosenbrock,
        &OptimizeConfig::bfgs(ConvergencePolicy::default()),
        initial,
        &mut sinks,
    )
    .unwrap();

    assert_eq!(report.status, TerminationStatus::Interrupted);
    assert_eq!(report.iterations, 1);
    assert_eq!(output.headers.len(), 1);
    assert_eq!(output.records.len(), 1);
    assert_eq!(TerminationStatus::Interrupted.exit_code(), 0);
}
