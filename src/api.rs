use crate::engine::{self, StageMetrics};
use crate::{AbelError, DiscoveryPayload, Loadsheet, PriorConfig, Report};
use chrono::{Local, NaiveDate, NaiveDateTime};
use std::time::Duration;
use uuid::Uuid;

/// Run context.
///
/// This holds the environment of a run that does not come from the inputs.
#[derive(Debug, Clone)]
pub struct Context {
    /// When the run started; shown in verbose output and tracing spans.
    pub run_started: NaiveDateTime,
}

impl Default for Context {
    fn default() -> Self {
        if cfg!(test) {
            let fixed = NaiveDate::from_ymd_opt(2024, 6, 27).and_then(|d| d.and_hms_opt(0, 0, 0));
            Self { run_started: fixed.unwrap_or_default() }
        } else {
            Self { run_started: Local::now().naive_local() }
        }
    }
}

/// How guids are minted for virtual entities that have no published guid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GuidStrategy {
    /// Name-based UUIDv5 over the building and entity code. Unchanged inputs
    /// mint unchanged guids, even without a prior configuration.
    #[default]
    Derived,
    /// Random UUIDv4 on every run.
    Random,
}

impl GuidStrategy {
    pub(crate) fn mint(&self, building: &str, code: &str) -> String {
        match self {
            GuidStrategy::Derived => Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{building}/{code}").as_bytes()),
            GuidStrategy::Random => Uuid::new_v4(),
        }
        .to_string()
    }
}

/// Options that affect conversion behavior.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub guids: GuidStrategy,
    /// Add the optional projection columns (entity display name and device
    /// id, field units-check marker).
    pub extended_columns: bool,
}

/// A compact per-stage trace.
#[derive(Debug, Clone)]
pub struct StageSummary {
    pub name: String,
    pub duration: Duration,
    pub produced: usize,
    pub notes: usize,
}

/// Additional details returned by [`convert_verbose_with`].
#[derive(Debug, Clone)]
pub struct ConversionDetails {
    pub run_started: NaiveDateTime,
    /// Total elapsed time.
    pub total: Duration,
    pub stages: Vec<StageSummary>,
}

/// Result from [`convert_verbose_with`].
#[derive(Debug, Clone)]
pub struct ConversionVerbose {
    pub report: Report,
    pub elapsed: Duration,
    pub details: ConversionDetails,
}

/// Convert with a default [`Context`] and default [`Options`].
///
/// # Example
/// ```
/// use abel::{DiscoveryPayload, Loadsheet, convert};
///
/// let report = convert(&Loadsheet::default(), &DiscoveryPayload::default(), None).unwrap();
/// assert!(report.entities.is_empty());
/// ```
pub fn convert(
    loadsheet: &Loadsheet,
    payload: &DiscoveryPayload,
    prior: Option<&PriorConfig>,
) -> Result<Report, AbelError> {
    convert_with(loadsheet, payload, prior, &Context::default(), &Options::default())
}

/// Convert using the provided `context`/`options`.
pub fn convert_with(
    loadsheet: &Loadsheet,
    payload: &DiscoveryPayload,
    prior: Option<&PriorConfig>,
    context: &Context,
    options: &Options,
) -> Result<Report, AbelError> {
    engine::Converter::new(loadsheet, payload, prior).run(context, options)
}

/// Convert with `context`/`options` and return per-stage timings and counts.
///
/// The default [`convert_with`] path does not keep these traces.
pub fn convert_verbose_with(
    loadsheet: &Loadsheet,
    payload: &DiscoveryPayload,
    prior: Option<&PriorConfig>,
    context: &Context,
    options: &Options,
) -> Result<ConversionVerbose, AbelError> {
    let run = engine::Converter::new(loadsheet, payload, prior).run_with_metrics(context, options)?;

    let details = ConversionDetails {
        run_started: context.run_started,
        total: run.metrics.total,
        stages: run.metrics.stages.iter().map(stage_to_summary).collect(),
    };

    Ok(ConversionVerbose { report: run.report, elapsed: run.metrics.total, details })
}

/// Expected engineering unit for a standard field name, e.g.
/// `zone_air_temperature_sensor` → `degrees_fahrenheit`.
pub fn expected_unit(standard_field_name: &str) -> Option<&'static str> {
    crate::rules::expected_unit(standard_field_name)
}

/// Standard state for a raw `active`/`inactive` token, e.g.
/// (`supply_fan_run_status`, `active`) → `ON`.
pub fn expected_state(standard_field_name: &str, raw_token: &str) -> Option<&'static str> {
    crate::rules::expected_state(standard_field_name, raw_token)
}

fn stage_to_summary(stage: &StageMetrics) -> StageSummary {
    StageSummary { name: stage.name.to_string(), duration: stage.duration, produced: stage.produced, notes: stage.notes }
}
