//! The linear conversion pipeline.
//!
//! ```text
//! Loadsheet ── intake ── classify ──┐
//!                                    ├─ reconcile ── stabilize ── report ──▶ Report
//! DiscoveryPayload ─────────────────┘                 ▲
//! PriorConfig (optional) ─────────────────────────────┘
//! ```
//!
//! Each stage is a function of the previous stage's output. Nothing is shared
//! between runs, and no output exists until every stage has succeeded.

use std::time::Instant;

use tracing::{info, info_span};

use super::classify::classify;
use super::intake::intake;
use super::metrics::{RunMetrics, RunResult, StageMetrics};
use super::reconcile::reconcile;
use super::report::{Report, ReportBuilder, ReportInput};
use super::stabilize::{Stabilized, stabilize};
use crate::{AbelError, Context, DiscoveryPayload, Loadsheet, Options, PriorConfig};

/// Converter orchestrates one run over borrowed inputs.
///
/// Usage: create with `Converter::new(&loadsheet, &payload, prior)` then call
/// `run(context, options)`.
#[derive(Debug, Clone, Copy)]
pub struct Converter<'a> {
    loadsheet: &'a Loadsheet,
    payload: &'a DiscoveryPayload,
    prior: Option<&'a PriorConfig>,
}

impl<'a> Converter<'a> {
    pub fn new(loadsheet: &'a Loadsheet, payload: &'a DiscoveryPayload, prior: Option<&'a PriorConfig>) -> Self {
        Self { loadsheet, payload, prior }
    }

    pub fn run(&self, context: &Context, options: &Options) -> Result<Report, AbelError> {
        self.run_with_metrics(context, options).map(|run| run.report)
    }

    pub fn run_with_metrics(&self, context: &Context, options: &Options) -> Result<RunResult, AbelError> {
        let span = info_span!("convert", run_started = %context.run_started);
        let _guard = span.enter();

        let started = Instant::now();
        let mut metrics = RunMetrics::default();

        let t = Instant::now();
        let intake = intake(&self.loadsheet.records)?;
        info!(rows = self.loadsheet.len(), points = intake.points.len(), notes = intake.notes.len(), "intake");
        metrics.stages.push(StageMetrics::new("intake", t.elapsed(), intake.points.len(), intake.notes.len()));

        let t = Instant::now();
        let classification = classify(&intake.points, &options.guids);
        info!(entities = classification.entities.len(), virtual_entities = classification.by_asset.len(), "classify");
        metrics.stages.push(StageMetrics::new("classify", t.elapsed(), classification.entities.len(), 0));

        let t = Instant::now();
        let mut reconciled = reconcile(&intake.points, classification, self.payload);
        info!(fields = reconciled.fields.len(), states = reconciled.states.len(), notes = reconciled.notes.len(), "reconcile");
        metrics.stages.push(StageMetrics::new(
            "reconcile",
            t.elapsed(),
            reconciled.fields.len() + reconciled.states.len(),
            reconciled.notes.len(),
        ));

        let t = Instant::now();
        let stabilized = match self.prior {
            Some(prior) => {
                stabilize(&mut reconciled.site, &mut reconciled.entities, &mut reconciled.fields, prior)
            }
            None => Stabilized::default(),
        };
        let existing = reconciled.entities.iter().filter(|e| e.is_existing).count();
        info!(existing, prior_virtual = stabilized.prior_virtuals.len(), "stabilize");
        metrics.stages.push(StageMetrics::new("stabilize", t.elapsed(), existing, stabilized.notes.len()));

        let t = Instant::now();
        let mut notes = intake.notes;
        notes.extend(reconciled.notes);
        notes.extend(stabilized.notes);
        let report = ReportBuilder::new(options.extended_columns).build(ReportInput {
            site: &reconciled.site,
            entities: &reconciled.entities,
            fields: &reconciled.fields,
            states: &reconciled.states,
            notes,
            prior_virtuals: &stabilized.prior_virtuals,
        })?;
        info!(log = report.log.len(), incorrect_units = report.incorrect_units.len(), "report");
        metrics.stages.push(StageMetrics::new(
            "report",
            t.elapsed(),
            report.entities.len() + report.entity_fields.len() + report.states.len(),
            0,
        ));

        metrics.total = started.elapsed();
        Ok(RunResult { report, metrics })
    }
}
