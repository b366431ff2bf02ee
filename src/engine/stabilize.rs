//! Carry identifiers over from a previously published configuration.
//!
//! A virtual entity whose code was published before takes over the published
//! guid and etag, and every field pointing at the provisional guid follows.
//! Any entity or site whose guid is already known gets the published etag.
//! Entities with no prior counterpart keep their fresh guid and an empty etag.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::{Entity, EntityField, PriorConfig, PriorEntry, Site, Slot};

/// A virtual entity from the prior configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PriorVirtual {
    pub code: String,
    pub guid: String,
    pub etag: Slot<String>,
}

#[derive(Debug, Default)]
pub(crate) struct Stabilized {
    /// Every prior virtual entity, sorted by code.
    pub prior_virtuals: Vec<PriorVirtual>,
    pub notes: Vec<String>,
}

pub(crate) fn stabilize(
    site: &mut Site,
    entities: &mut [Entity],
    fields: &mut [EntityField],
    prior: &PriorConfig,
) -> Stabilized {
    let mut by_code: BTreeMap<&str, (&str, &PriorEntry)> = BTreeMap::new();
    for (guid, entry) in prior.virtual_entries() {
        let Some(code) = entry.code.as_deref() else {
            continue;
        };
        if let Some((kept, _)) = by_code.get(code) {
            warn!(code, kept = *kept, ignored = guid, "prior configuration lists a virtual entity code twice");
            continue;
        }
        by_code.insert(code, (guid, entry));
    }

    let mut matched: BTreeSet<&str> = BTreeSet::new();
    for entity in entities.iter_mut().filter(|e| e.is_virtual()) {
        let Some(code) = entity.code.present().cloned() else {
            continue;
        };
        let Some((&prior_code, &(guid, entry))) = by_code.get_key_value(code.as_str()) else {
            continue;
        };

        let provisional = std::mem::replace(&mut entity.guid, Slot::Present(guid.to_string()));
        entity.etag = Slot::from_option(entry.etag.clone());
        entity.is_existing = true;
        debug!(code = %code, guid, "virtual entity keeps published guid");

        for field in fields.iter_mut().filter(|f| f.entity_guid == provisional) {
            field.entity_guid = entity.guid.clone();
        }
        matched.insert(prior_code);
    }

    for entity in entities.iter_mut() {
        let Some(entry) = entity.guid.present().and_then(|g| prior.get(g)) else {
            continue;
        };
        entity.etag = Slot::from_option(entry.etag.clone());
        entity.is_existing = true;
    }

    if let Some(entry) = site.guid.present().and_then(|g| prior.get(g)) {
        site.etag = Slot::from_option(entry.etag.clone());
    }

    let mut notes = Vec::new();
    for (code, (guid, _)) in &by_code {
        if !matched.contains(code) {
            notes.push(format!("Existing virtual entity has no counterpart in this run: {code} ({guid})"));
        }
    }

    let prior_virtuals = by_code
        .iter()
        .map(|(code, (guid, entry))| PriorVirtual {
            code: code.to_string(),
            guid: guid.to_string(),
            etag: Slot::from_option(entry.etag.clone()),
        })
        .collect();

    Stabilized { prior_virtuals, notes }
}
