//! Conversion engine.
//!
//! This module is the entry point for turning a loadsheet, a discovery payload
//! and an optional prior configuration into a [`Report`]. The work is split
//! into focused submodules under `src/engine/`, one per stage.
//!
//! ## How the parts work together
//!
//! ```text
//! LoadsheetRecord[] ── intake (intake.rs)
//!                        - trim + lint, required rows only
//!                        - sort, deviceId fill, uniqueness checks
//!                               │ Vec<Point>
//!                               v
//!                      classify (classify.rs)
//!                        - passthrough / direct / virtual entities
//!                               │ Classification
//!                               v
//! DiscoveryPayload ──▶ reconcile (reconcile.rs)
//!                        - device identities or placeholders
//!                        - owner + reporting identities per field
//!                        - enumerate labels (enumerate.rs)
//!                        - unit checks, state rows
//!                               │ Reconciled
//!                               v
//! PriorConfig ───────▶ stabilize (stabilize.rs)
//!                        - published guids/etags win
//!                               │
//!                               v
//!                      ReportBuilder (report.rs) ──▶ Report
//! ```
//!
//! `pipeline.rs` runs the stages in order; `metrics.rs` holds optional timing
//! data for a run.
//!
//! ## Invariants
//!
//! - Identical inputs produce identical reports, labels included. Nothing in
//!   the engine iterates a hash map when producing output.
//! - Labels are assigned in a single pass over every field of a run.
//! - A report is only produced once every stage has succeeded.
//!
//! ## Debugging
//!
//! Every stage logs through `tracing`. The CLI reads its filter from
//! `ABEL_LOG`, e.g. `ABEL_LOG=abel=debug`.

#[path = "engine/classify.rs"]
mod classify;
#[path = "engine/enumerate.rs"]
mod enumerate;
#[path = "engine/intake.rs"]
mod intake;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/pipeline.rs"]
mod pipeline;
#[path = "engine/reconcile.rs"]
mod reconcile;
#[path = "engine/report.rs"]
mod report;
#[path = "engine/stabilize.rs"]
mod stabilize;

pub(crate) use metrics::StageMetrics;
pub use pipeline::Converter;
pub use report::{
    EntityFieldRow, EntityRow, ExistingVirtualEntityRow, IncorrectUnitsRow, Report, SiteRow, StateRow,
};
