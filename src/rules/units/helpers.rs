/// Fold a unit string to a comparison key: lowercase, with runs of `_`, `-`
/// and whitespace collapsed to a single `-`.
///
/// `degrees_fahrenheit`, `Degrees-Fahrenheit` and `degrees fahrenheit` all
/// fold to `degrees-fahrenheit`.
pub fn unit_key(unit: &str) -> String {
    regex!(r"[\s_\-]+").replace_all(unit.trim(), "-").to_ascii_lowercase()
}

/// Render a unit in the raw (hyphenated) form devices report.
pub fn to_raw_unit(unit: &str) -> String {
    unit_key(unit)
}

/// Render a unit in the standard (underscore) form used by the ontology.
pub fn to_standard_unit(unit: &str) -> String {
    unit_key(unit).replace('-', "_")
}

/// Returns true when both units fold to the same key.
pub fn same_unit(a: &str, b: &str) -> bool {
    unit_key(a) == unit_key(b)
}
