//! Deterministic labelling of repeated fields within a reporting scope.
//!
//! Fields are grouped by `(scope, standard_field_name)`. A group of one keeps
//! the bare standard field name. Larger groups get `_<rank>` suffixes:
//!
//! ```text
//! present fields  ── stable sort by raw field name ──▶ ranks 1..=P
//! missing fields  ── input order ────────────────────▶ ranks P+1..=P+M
//! ```
//!
//! Bare names are reserved in their scope before any rank is handed out. A
//! rank whose label is already taken (`zone_air_temperature_sensor_1` declared
//! as a field of its own) is skipped, so labels are always distinct within a
//! scope.

use std::collections::{BTreeMap, BTreeSet};

/// One field to label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldKey<'a> {
    /// Reporting entity guid, or its placeholder text.
    pub scope: &'a str,
    pub standard_field_name: &'a str,
    pub raw_field_name: Option<&'a str>,
}

/// Label every key; the output is index-aligned with `keys`.
pub(crate) fn enumerate(keys: &[FieldKey<'_>]) -> Vec<String> {
    let mut groups: BTreeMap<(&str, &str), Vec<usize>> = BTreeMap::new();
    for (idx, key) in keys.iter().enumerate() {
        groups.entry((key.scope, key.standard_field_name)).or_default().push(idx);
    }

    let mut labels = vec![String::new(); keys.len()];
    let mut taken: BTreeSet<(&str, String)> = BTreeSet::new();
    for (&(scope, name), members) in &groups {
        if let [only] = members.as_slice() {
            labels[*only] = name.to_string();
            taken.insert((scope, name.to_string()));
        }
    }

    for ((scope, name), members) in groups {
        if members.len() == 1 {
            continue;
        }

        let (mut present, missing): (Vec<usize>, Vec<usize>) =
            members.into_iter().partition(|&idx| keys[idx].raw_field_name.is_some());
        // Stable: equal raw names keep input order.
        present.sort_by(|&a, &b| keys[a].raw_field_name.cmp(&keys[b].raw_field_name));

        let mut rank = 0usize;
        for idx in present.into_iter().chain(missing) {
            let label = loop {
                rank += 1;
                let label = format!("{name}_{rank}");
                if taken.insert((scope, label.clone())) {
                    break label;
                }
            };
            labels[idx] = label;
        }
    }
    labels
}
