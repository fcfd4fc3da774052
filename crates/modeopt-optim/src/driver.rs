//! Generic quasi-Newton driver loop.
//!
//! [`QuasiNewtonDriver`] runs any [`Stepper`] to completion while handling
//! everything around the numerics: progress reports, iteration records,
//! the interrupt hook and forwarding of buffered stepper diagnostics.

use crate::report::OptimizeReport;
use crate::stepper::{StepOutcome, StepProgress, Stepper};
use log::debug;
use modeopt_core::{sinks::Sinks, status::TerminationStatus};

/// Column header of the progress table.
pub const PROGRESS_HEADER: &str =
    "    Iter      log prob        ||dx||      ||grad||       alpha      alpha0  # evals  Notes ";

/// Formats one row of the progress table.
pub fn format_progress(progress: &StepProgress) -> String {
    format!(
        "{:>8} {:>13.6} {:>13.6e} {:>13.6e} {:>11.4e} {:>11.4e} {:>8}  {}",
        progress.iteration,
        progress.log_density,
        progress.step_norm,
        progress.gradient_norm,
        progress.alpha,
        progress.alpha0,
        progress.evaluations,
        progress.note
    )
}

/// Runs a [`Stepper`] until it terminates or the run is interrupted.
#[derive(Debug)]
pub struct QuasiNewtonDriver<S> {
    stepper: S,
    save_iterations: bool,
    refresh: usize,
}

impl<S: Stepper> QuasiNewtonDriver<S> {
    /// Wraps `stepper`, reporting progress every 100 iterations.
    pub fn new(stepper: S) -> Self {
        Self {
            stepper,
            save_iterations: false,
            refresh: 100,
        }
    }

    /// Emit a record after every iteration.
    pub fn with_save_iterations(mut self, save: bool) -> Self {
        self.save_iterations = save;
        self
    }

    /// Progress report cadence; 0 disables reports.
    pub fn with_refresh(mut self, refresh: usize) -> Self {
        self.refresh = refresh;
        self
    }

    fn flush_messages(&mut self, sinks: &mut Sinks<'_>) {
        for message in self.stepper.drain_messages() {
            sinks.info(&message);
        }
    }

    fn report_progress(&self, terminal: bool, sinks: &mut Sinks<'_>) {
        if self.refresh == 0 {
            return;
        }
        let progress = self.stepper.progress();
        let k = progress.iteration;
        let on_cadence = k == 1 || k % self.refresh == 0;
        if !(on_cadence || terminal || !progress.note.is_empty()) {
            return;
        }
        if on_cadence {
            sinks.info(PROGRESS_HEADER);
        }
        sinks.info(&format_progress(&progress));
    }

    /// Runs the stepper to completion.
    ///
    /// Records are numbered from 1. When `save_iterations` is off, only the
    /// final iterate is recorded. An interrupt takes precedence over a
    /// terminal status reached in the same iteration.
    pub fn run(mut self, sinks: &mut Sinks<'_>) -> OptimizeReport {
        self.flush_messages(sinks);
        sinks.info(&format!(
            "initial log joint probability = {}",
            self.stepper.log_density()
        ));

        let status = loop {
            let outcome = self.stepper.advance();
            self.report_progress(outcome.is_terminal(), sinks);

            let iteration = self.stepper.iteration();
            if self.save_iterations {
                sinks.record(iteration, self.stepper.log_density(), self.stepper.parameters());
            }
            if sinks.interrupted() {
                debug!("interrupted at iteration {iteration}");
                self.flush_messages(sinks);
                break TerminationStatus::Interrupted;
            }
            if let StepOutcome::Terminate(status) = outcome {
                break status;
            }
        };

        self.flush_messages(sinks);
        match status {
            TerminationStatus::Interrupted => sinks.info("Optimization interrupted:"),
            status if status.is_error() => sinks.info("Optimization terminated with error:"),
            _ => sinks.info("Optimization terminated normally:"),
        }
        sinks.info(&format!("  {}", status.description()));

        let iterations = self.stepper.iteration();
        let log_density = self.stepper.log_density();
        if !self.save_iterations {
            sinks.record(iterations, log_density, self.stepper.parameters());
        }

        OptimizeReport {
            status,
            parameters: self.stepper.parameters().clone(),
            log_density,
            iterations,
        }
    }
}
