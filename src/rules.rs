//! Unit and state classification of standard field names.
//!
//! Both lookups run a standard field name (for example
//! `supply_air_static_pressure_sensor`) against a table of keyword rules and
//! take the most specific match:
//!
//! ```text
//! field ──▶ rules (all patterns must match) ──▶ best by (priority, #patterns)
//!                                               └─ ties: first declared wins
//! ```
//!
//! A miss is not an error. Callers treat `None` as "no expectation" and carry
//! on with whatever the loadsheet declared.

use once_cell::sync::Lazy;
use tracing::trace;

use crate::{Dimension, Production, Rule, best_match};

pub(crate) mod states;
pub(crate) mod units;

static DEFAULT_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    let mut rules = units::rules::get();
    rules.extend(states::rules::get());
    rules
});

/// Expected engineering unit for `standard_field_name`, in standard
/// (underscore) form such as `degrees_fahrenheit`.
pub(crate) fn expected_unit(standard_field_name: &str) -> Option<&'static str> {
    let field = standard_field_name.trim().to_ascii_lowercase();
    let rule = best_match(&DEFAULT_RULES, Dimension::Unit, &field)?;
    trace!(field = %field, rule = rule.name, "unit rule");
    match rule.production {
        Production::Unit(unit) => Some(unit),
        Production::States { .. } => None,
    }
}

/// Standard state for a raw binary token (`active` / `inactive`) reported by
/// the point behind `standard_field_name`.
pub(crate) fn expected_state(standard_field_name: &str, raw_token: &str) -> Option<&'static str> {
    let token = states::normalize_token(raw_token)?;
    let field = standard_field_name.trim().to_ascii_lowercase();
    let rule = best_match(&DEFAULT_RULES, Dimension::State, &field)?;
    trace!(field = %field, rule = rule.name, "state rule");
    match rule.production {
        Production::States { active, inactive } => Some(match token {
            states::BinaryToken::Active => active,
            states::BinaryToken::Inactive => inactive,
        }),
        Production::Unit(_) => None,
    }
}
