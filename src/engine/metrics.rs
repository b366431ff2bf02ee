//! Conversion run metrics.
//!
//! The intended usage is:
//!
//! - `Converter::run` for normal operation.
//! - `Converter::run_with_metrics` for profiling a run and seeing how many
//!   rows and log notes each stage produced.

use std::time::Duration;

use super::report::Report;

// --- Metrics -----------------------------------------------------------------

#[derive(Debug, Default, Clone)]
pub struct RunMetrics {
    /// Total elapsed time for [`Converter::run_with_metrics`].
    pub total: Duration,
    /// One entry per pipeline stage, in execution order.
    pub stages: Vec<StageMetrics>,
}

/// Timing and output counts for a single stage.
#[derive(Debug, Default, Clone)]
pub struct StageMetrics {
    pub name: &'static str,
    pub duration: Duration,
    /// Rows produced by the stage (points, entities, fields, ...).
    pub produced: usize,
    /// Log notes the stage added.
    pub notes: usize,
}

impl StageMetrics {
    pub(crate) fn new(name: &'static str, duration: Duration, produced: usize, notes: usize) -> Self {
        Self { name, duration, produced, notes }
    }
}

/// Converter output bundled with timing information.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub report: Report,
    pub metrics: RunMetrics,
}
