extern crate self as abel;

use regex::Regex;

#[macro_use]
mod macros;
mod api;
mod engine;
mod error;
mod model;
mod rules;
mod sources;

pub use api::{
    Context, ConversionDetails, ConversionVerbose, GuidStrategy, Options, StageSummary, convert, convert_verbose_with,
    convert_with, expected_state, expected_unit,
};
pub use engine::{
    EntityFieldRow, EntityRow, ExistingVirtualEntityRow, IncorrectUnitsRow, Report, SiteRow, StateRow,
};
pub use error::AbelError;
pub use model::{DeviceLink, Entity, EntityField, EntityKind, LogEntry, Namespace, ObjectClass, Site, State};
pub use sources::{
    DiscoveredPoint, DiscoveryPayload, DiscoveryRecord, Loadsheet, LoadsheetRecord, PriorConfig, PriorEntry, StateText,
};

// --- Tagged values ----------------------------------------------------------

/// A value that may be backed by one of the input sources, known to be absent,
/// or stood in for by a placeholder an operator has to review.
///
/// Placeholders carry the exact text that lands in the output tables (for
/// example `MISSING CODE: DEV:12`), so they stay visible downstream without
/// being mistaken for real data inside the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Slot<T> {
    Present(T),
    #[default]
    MissingInSource,
    PlaceholderPendingReview(String),
}

impl<T> Slot<T> {
    pub fn present(&self) -> Option<&T> {
        match self {
            Slot::Present(value) => Some(value),
            _ => None,
        }
    }

    pub fn from_option(value: Option<T>) -> Self {
        value.map_or(Slot::MissingInSource, Slot::Present)
    }
}

impl Slot<String> {
    /// Render the slot the way it appears in an output table cell.
    pub fn project(&self) -> String {
        match self {
            Slot::Present(value) => value.clone(),
            Slot::MissingInSource => String::new(),
            Slot::PlaceholderPendingReview(reason) => reason.clone(),
        }
    }
}

// --- Keyword rules ------------------------------------------------------------

/// What a keyword rule classifies a standard field name into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Dimension {
    Unit,
    State,
}

/// Result attached to a rule when all of its patterns match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Production {
    /// Expected engineering unit in standard (underscore) form.
    Unit(&'static str),
    /// Standard states for the `active` and `inactive` raw tokens.
    States { active: &'static str, inactive: &'static str },
}

impl Production {
    pub(crate) fn dim(&self) -> Dimension {
        match self {
            Production::Unit(_) => Dimension::Unit,
            Production::States { .. } => Dimension::State,
        }
    }
}

// Pattern items used by rules. A rule matches when every item matches the
// standard field name.
#[derive(Debug)]
pub(crate) enum Pattern {
    /// The field name contains the keyword.
    Contains(&'static str),
    /// The field name contains at least one of the keywords.
    AnyOf(&'static [&'static str]),
    /// The field name is exactly the keyword.
    Exact(&'static str),
    /// Match a regular expression against the field name. The `Regex` is
    /// stored as a static reference (created via the `regex!` helper macro in
    /// `src/macros.rs`).
    Regex(&'static Regex),
}

impl Pattern {
    pub(crate) fn matches(&self, field: &str) -> bool {
        match self {
            Pattern::Contains(keyword) => field.contains(keyword),
            Pattern::AnyOf(keywords) => keywords.iter().any(|k| field.contains(k)),
            Pattern::Exact(keyword) => field == *keyword,
            Pattern::Regex(re) => re.is_match(field),
        }
    }
}

/// A classification rule: a name, a conjunctive `pattern`, the `production`
/// it yields, and a `priority` tier.
///
/// When several rules match the same field the winner is picked by
/// `(priority, pattern.len())`, highest first, then by declaration order.
/// More keywords means a more specific rule.
#[derive(Debug)]
pub(crate) struct Rule {
    pub name: &'static str,
    pub pattern: Vec<Pattern>,
    pub production: Production,
    pub priority: u16,
}

impl Rule {
    pub(crate) fn matches(&self, field: &str) -> bool {
        !self.pattern.is_empty() && self.pattern.iter().all(|p| p.matches(field))
    }

    pub(crate) fn specificity(&self) -> (u16, usize) {
        (self.priority, self.pattern.len())
    }
}

/// Pick the most specific rule of `dim` matching `field`.
pub(crate) fn best_match<'a>(rules: &'a [Rule], dim: Dimension, field: &str) -> Option<&'a Rule> {
    let mut best: Option<&Rule> = None;
    for rule in rules.iter().filter(|r| r.production.dim() == dim) {
        if !rule.matches(field) {
            continue;
        }
        // Strictly greater keeps the earliest declaration on ties.
        if best.is_none_or(|b| rule.specificity() > b.specificity()) {
            best = Some(rule);
        }
    }
    best
}
