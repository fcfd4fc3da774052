//! Output channels and cancellation hooks for optimization runs.
//!
//! The drivers never print. Everything they produce goes through one of
//! four channels bundled in [`Sinks`]:
//!
//! - an [`OutputWriter`] receiving the header (parameter names) once, then
//!   [`IterationRecord`]s,
//! - an informational [`MessageWriter`] for progress and diagnostics,
//! - an error [`MessageWriter`] for recovered model failures,
//! - an [`Interrupt`] polled once per iteration.

use crate::types::ParameterVector;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Snapshot of one iterate.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IterationRecord {
    /// Iteration index (0 is the initial point)
    pub index: usize,
    /// Log density at `parameters`
    pub log_density: f64,
    /// The iterate
    pub parameters: ParameterVector,
}

impl IterationRecord {
    /// Creates a record.
    pub fn new(index: usize, log_density: f64, parameters: ParameterVector) -> Self {
        Self {
            index,
            log_density,
            parameters,
        }
    }

    /// Flattens the record into one row matching the header layout.
    pub fn to_row(&self) -> Vec<f64> {
        std::iter::once(self.log_density)
            .chain(self.parameters.iter().copied())
            .collect()
    }
}

/// Receiver of the header and of iteration records.
pub trait OutputWriter {
    /// Called once per run with `lp__` followed by the parameter names.
    fn write_header(&mut self, names: &[String]);

    /// Called for each emitted iterate.
    fn write_iteration(&mut self, record: IterationRecord);
}

/// Receiver of free-form text messages.
pub trait MessageWriter {
    /// Writes one message.
    fn write_message(&mut self, message: &str);
}

/// Cooperative cancellation hook.
pub trait Interrupt {
    /// Returns true when the run should stop at this iteration boundary.
    fn interrupted(&mut self) -> bool;
}

impl<F> Interrupt for F
where
    F: FnMut() -> bool,
{
    fn interrupted(&mut self) -> bool {
        self()
    }
}

impl MessageWriter for Vec<String> {
    fn write_message(&mut self, message: &str) {
        self.push(message.to_string());
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullWriter;

impl OutputWriter for NullWriter {
    fn write_header(&mut self, _names: &[String]) {}

    fn write_iteration(&mut self, _record: IterationRecord) {}
}

impl MessageWriter for NullWriter {
    fn write_message(&mut self, _message: &str) {}
}

/// Never interrupts.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInterrupt;

impl Interrupt for NoInterrupt {
    fn interrupted(&mut self) -> bool {
        false
    }
}

/// Keeps the header and records in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryWriter {
    /// Every header received, in order
    pub headers: Vec<Vec<String>>,
    /// Every record received, in order
    pub records: Vec<IterationRecord>,
}

impl MemoryWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// The last record received, if any.
    pub fn last(&self) -> Option<&IterationRecord> {
        self.records.last()
    }
}

impl OutputWriter for MemoryWriter {
    fn write_header(&mut self, names: &[String]) {
        self.headers.push(names.to_vec());
    }

    fn write_iteration(&mut self, record: IterationRecord) {
        self.records.push(record);
    }
}

/// Forwards messages to the `log` facade at a fixed level.
#[derive(Debug, Clone, Copy)]
pub struct LogWriter {
    level: log::Level,
}

impl LogWriter {
    /// Writer logging at `level`.
    pub fn new(level: log::Level) -> Self {
        Self { level }
    }

    /// Writer for informational messages.
    pub fn info() -> Self {
        Self::new(log::Level::Info)
    }

    /// Writer for error messages.
    pub fn error() -> Self {
        Self::new(log::Level::Error)
    }
}

impl MessageWriter for LogWriter {
    fn write_message(&mut self, message: &str) {
        log::log!(target: "modeopt", self.level, "{message}");
    }
}

/// Cancellation flag shareable across threads.
///
/// Clones share the same flag: hand one clone to the run and keep another
/// to request cancellation from a signal handler or another thread.
#[derive(Debug, Default, Clone)]
pub struct InterruptFlag {
    flag: Arc<AtomicBool>,
}

impl InterruptFlag {
    /// Creates a cleared flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation at the next iteration boundary.
    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clears a pending request.
    pub fn clear(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

impl Interrupt for InterruptFlag {
    fn interrupted(&mut self) -> bool {
        self.is_requested()
    }
}

/// The channels of one optimization run.
pub struct Sinks<'a> {
    output: &'a mut dyn OutputWriter,
    info: &'a mut dyn MessageWriter,
    error: &'a mut dyn MessageWriter,
    interrupt: &'a mut dyn Interrupt,
}

impl<'a> Sinks<'a> {
    /// Bundles the four channels.
    pub fn new(
        output: &'a mut dyn OutputWriter,
        info: &'a mut dyn MessageWriter,
        error: &'a mut dyn MessageWriter,
        interrupt: &'a mut dyn Interrupt,
    ) -> Self {
        Self {
            output,
            info,
            error,
            interrupt,
        }
    }

    /// Writes the header.
    pub fn header(&mut self, names: &[String]) {
        self.output.write_header(names);
    }

    /// Writes an iteration record.
    pub fn record(&mut self, index: usize, log_density: f64, parameters: &ParameterVector) {
        self.output
            .write_iteration(IterationRecord::new(index, log_density, parameters.clone()));
    }

    /// Writes an informational message.
    pub fn info(&mut self, message: &str) {
        self.info.write_message(message);
    }

    /// Writes an error message.
    pub fn error(&mut self, message: &str) {
        self.error.write_message(message);
    }

    /// Polls the interrupt hook.
    pub fn interrupted(&mut self) -> bool {
        self.interrupt.interrupted()
    }
}

impl std::fmt::Debug for Sinks<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sinks").finish_non_exhaustive()
    }
}
