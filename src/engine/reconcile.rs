//! Join the loadsheet against the discovery payload.
//!
//! Reconciliation fills in what the classifier could not know: device
//! identities from discovery, per-field owner/reporting identities, enumerated
//! labels, unit checks and state rows. Gaps between the sources never fail
//! the run; they become placeholders plus a log note.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use super::classify::Classification;
use super::enumerate::{FieldKey, enumerate};
use super::intake::{ObjectRef, Point};
use crate::rules::states::DEFAULT_TOKENS;
use crate::rules::units::helpers::{same_unit, to_raw_unit, to_standard_unit};
use crate::rules::{expected_state, expected_unit};
use crate::{DiscoveredPoint, DiscoveryPayload, Entity, EntityField, Site, Slot, State, StateText};

#[derive(Debug)]
pub(crate) struct Reconciled {
    pub site: Site,
    pub entities: Vec<Entity>,
    pub fields: Vec<EntityField>,
    pub states: Vec<State>,
    pub notes: Vec<String>,
}

/// What discovery knows about one device.
#[derive(Debug, Default)]
struct DeviceIdentity<'a> {
    cloud_device_id: Option<&'a str>,
    entity_code: Option<&'a str>,
    entity_guid: Option<&'a str>,
    points: BTreeMap<String, &'a DiscoveredPoint>,
}

pub(crate) fn reconcile(points: &[Point], classification: Classification, payload: &DiscoveryPayload) -> Reconciled {
    let mut notes = Vec::new();
    let devices = index_devices(payload);
    let site = site_of(points, payload);

    // Devices in loadsheet order.
    let mut seen_devices = BTreeSet::new();
    for point in points {
        if seen_devices.insert(point.device_id.as_str()) && !devices.contains_key(&point.device_id) {
            warn!(device = %point.device_id, "device missing in discovery");
            notes.push(format!("Required device is missing in discovery: {}", point.device_id));
        }
    }

    let required_objects: BTreeSet<(&str, String)> = points
        .iter()
        .filter_map(|p| p.raw_field_name().map(|raw| (p.device_id.as_str(), raw)))
        .collect();
    for (device, raw) in &required_objects {
        let found = devices.get(*device).is_some_and(|d| d.points.contains_key(raw));
        if !found {
            debug!(device, raw = %raw, "object missing in discovery");
            notes.push(format!("Required object missing in discovery: {device}, {raw}"));
        }
    }

    let Classification { mut entities, by_device, by_asset } = classification;
    for entity in entities.iter_mut().filter(|e| e.is_reporting()) {
        let Some(device) = entity.device.device_id().map(str::to_string) else {
            continue;
        };
        let identity = devices.get(&device);
        entity.code = discovered_or(identity.and_then(|d| d.entity_code), || format!("MISSING CODE: {device}"));
        entity.cloud_device_id =
            discovered_or(identity.and_then(|d| d.cloud_device_id), || format!("MISSING ID: {device}"));
        entity.guid = discovered_or(identity.and_then(|d| d.entity_guid), || format!("MISSING GUID: {device}"));
    }

    let mut fields: Vec<EntityField> = points
        .iter()
        .map(|point| {
            let reporting = by_device.get(&point.device_id).map(|&idx| &entities[idx]);
            let owner = by_asset.get(&point.asset_path).map(|&idx| &entities[idx]).or(reporting);
            let discovered = point
                .raw_field_name()
                .and_then(|raw| devices.get(&point.device_id).and_then(|d| d.points.get(&raw).copied()));
            build_field(point, reporting, owner, discovered)
        })
        .collect();

    let scopes: Vec<String> = fields.iter().map(|f| f.reporting_entity_guid.project()).collect();
    let keys: Vec<FieldKey<'_>> = fields
        .iter()
        .zip(&scopes)
        .map(|(field, scope)| FieldKey {
            scope,
            standard_field_name: &field.standard_field_name,
            raw_field_name: field.raw_field_name.as_deref(),
        })
        .collect();
    let labels = enumerate(&keys);
    for (field, label) in fields.iter_mut().zip(labels) {
        field.reporting_entity_field = label;
    }

    let states = explode_states(&fields, |field| {
        devices
            .get(&field.device_id)
            .and_then(|d| field.raw_field_name.as_ref().and_then(|raw| d.points.get(raw).copied()))
    });

    debug!(entities = entities.len(), fields = fields.len(), states = states.len(), "reconciled");
    Reconciled { site, entities, fields, states, notes }
}

fn index_devices(payload: &DiscoveryPayload) -> BTreeMap<String, DeviceIdentity<'_>> {
    let mut devices: BTreeMap<String, DeviceIdentity<'_>> = BTreeMap::new();
    for record in &payload.records {
        let Some(device) = record.normalized_device_id() else {
            debug!(entity_code = ?record.entity_code, "discovery record without device id skipped");
            continue;
        };
        let identity = devices.entry(device).or_default();
        identity.cloud_device_id = identity.cloud_device_id.or(record.cloud_device_id.as_deref());
        identity.entity_code = identity.entity_code.or(record.entity_code.as_deref());
        identity.entity_guid = identity.entity_guid.or(record.entity_guid.as_deref());
        for (raw, point) in record.points() {
            identity.points.entry(raw).or_insert(point);
        }
    }
    devices
}

fn site_of(points: &[Point], payload: &DiscoveryPayload) -> Site {
    let discovered = payload
        .records
        .first()
        .and_then(|r| r.building.clone().map(|code| (code, Slot::from_option(r.building_guid.clone()))));
    match discovered {
        Some((building_code, guid)) => Site { building_code, guid, etag: Slot::MissingInSource },
        None => Site {
            building_code: points.iter().map(|p| p.building.clone()).find(|b| !b.is_empty()).unwrap_or_default(),
            guid: Slot::MissingInSource,
            etag: Slot::MissingInSource,
        },
    }
}

fn discovered_or(value: Option<&str>, placeholder: impl FnOnce() -> String) -> Slot<String> {
    match value {
        Some(value) => Slot::Present(value.to_string()),
        None => Slot::PlaceholderPendingReview(placeholder()),
    }
}

fn build_field(
    point: &Point,
    reporting: Option<&Entity>,
    owner: Option<&Entity>,
    discovered: Option<&DiscoveredPoint>,
) -> EntityField {
    // Every device has a reporting entity, and reconciliation has already
    // replaced its code and guid with discovered values or placeholders.
    let reporting_entity_code = reporting.map(|e| e.code.clone()).unwrap_or_default();
    let reporting_entity_guid = reporting.map(|e| e.guid.clone()).unwrap_or_default();

    let class = point.object.as_ref().map(|o| o.class);
    let stateful = class.is_some_and(|c| c.is_stateful());

    let mut field = EntityField {
        entity_code: owner.map(|e| e.code.clone()).unwrap_or_default(),
        entity_guid: owner.map(|e| e.guid.clone()).unwrap_or_default(),
        reporting_entity_code,
        reporting_entity_guid,
        reporting_entity_field: String::new(),
        standard_field_name: point.standard_field_name.clone(),
        raw_field_name: point.raw_field_name(),
        raw_unit_path: None,
        standard_unit_value: None,
        raw_unit_value: None,
        missing: point.is_missing(),
        units_mismatch: false,
        discovered_unit: None,
        object_class: class,
        device_id: point.device_id.clone(),
        control_program: point.control_program.clone(),
        object_ref: point.object.as_ref().map(ObjectRef::label),
        object_name: match (point.object_name.is_empty(), discovered.and_then(|d| d.object_name.as_ref())) {
            (true, Some(name)) => name.clone(),
            _ => point.object_name.clone(),
        },
    };

    let Some(object) = point.object.as_ref().filter(|_| !stateful) else {
        return field;
    };

    let standard = expected_unit(&point.standard_field_name)
        .map(str::to_string)
        .or_else(|| point.declared_unit.as_deref().map(to_standard_unit));
    let reported = discovered.and_then(|d| d.units.clone());

    field.units_mismatch = matches!((&standard, &reported), (Some(s), Some(r)) if !same_unit(s, r));
    if field.units_mismatch {
        debug!(field = %point.standard_field_name, device = %point.device_id, "units differ from discovery");
    }
    field.raw_unit_path = Some(object.raw_unit_path());
    field.raw_unit_value = standard.as_deref().map(to_raw_unit).or_else(|| reported.clone());
    field.standard_unit_value = standard;
    field.discovered_unit = reported;
    field
}

/// One state row per distinct raw state of every present stateful field.
fn explode_states<'a>(
    fields: &[EntityField],
    lookup: impl Fn(&EntityField) -> Option<&'a DiscoveredPoint>,
) -> Vec<State> {
    let mut states = Vec::new();
    let mut seen = BTreeSet::new();

    for field in fields.iter().filter(|f| !f.missing && f.is_stateful()) {
        for (raw_state, raw_state_value, standard_state) in raw_states(field, lookup(field)) {
            let key = (field.reporting_entity_guid.project(), field.reporting_entity_field.clone(), raw_state.clone());
            if !seen.insert(key) {
                continue;
            }
            states.push(State {
                reporting_entity_code: field.reporting_entity_code.clone(),
                reporting_entity_guid: field.reporting_entity_guid.clone(),
                reporting_entity_field: field.reporting_entity_field.clone(),
                standard_state,
                raw_state,
                raw_state_value,
            });
        }
    }

    states.sort_by(|a, b| {
        a.reporting_entity_code
            .project()
            .cmp(&b.reporting_entity_code.project())
            .then_with(|| a.reporting_entity_field.cmp(&b.reporting_entity_field))
    });
    states
}

/// Enumerated state text wins only when the device does not also report a
/// complete active/inactive pair. Everything else falls back to the canonical
/// `active`/`inactive` pair.
fn raw_states(field: &EntityField, point: Option<&DiscoveredPoint>) -> Vec<(String, Option<String>, Option<String>)> {
    let texts = point.and_then(|p| {
        let binary = p.active_text.is_some() && p.inactive_text.is_some();
        match &p.state_text {
            Some(StateText::List(texts)) if !binary && !texts.is_empty() => Some(texts),
            _ => None,
        }
    });

    match texts {
        Some(texts) => {
            texts.iter().enumerate().map(|(idx, text)| ((idx + 1).to_string(), Some(text.clone()), None)).collect()
        }
        None => DEFAULT_TOKENS
            .iter()
            .map(|token| {
                let standard = expected_state(&field.standard_field_name, token.as_str()).map(str::to_string);
                (token.as_str().to_string(), None, standard)
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::classify::classify;
    use crate::engine::intake::intake;
    use crate::{DiscoveryRecord, GuidStrategy, LoadsheetRecord, ObjectClass};

    fn row(asset: &str, field: &str, device: &str, object: (&str, &str), units: &str) -> LoadsheetRecord {
        LoadsheetRecord {
            required: "YES".into(),
            is_missing: "NO".into(),
            building: "B".into(),
            general_type: "AHU".into(),
            type_name: "AHU_SFSS".into(),
            asset_name: asset.into(),
            full_asset_path: format!("B:AHU:{asset}"),
            standard_field_name: field.into(),
            device_id: device.into(),
            object_type: object.0.into(),
            object_id: object.1.into(),
            units: units.into(),
            ..LoadsheetRecord::default()
        }
    }

    fn device(id: &str, code: &str, guid: &str, data: &[(&str, DiscoveredPoint)]) -> DiscoveryRecord {
        DiscoveryRecord {
            cloud_device_id: Some(format!("cloud-{code}")),
            entity_code: Some(code.into()),
            entity_guid: Some(guid.into()),
            building: Some("B".into()),
            building_guid: Some("site-guid".into()),
            device_id: Some(id.into()),
            data: data.iter().map(|(k, p)| (k.to_string(), p.clone())).collect(),
        }
    }

    fn units(u: &str) -> DiscoveredPoint {
        DiscoveredPoint { units: Some(u.into()), ..DiscoveredPoint::default() }
    }

    fn run(records: &[LoadsheetRecord], payload: &DiscoveryPayload) -> Reconciled {
        let points = intake(records).unwrap().points;
        let classification = classify(&points, &GuidStrategy::Derived);
        reconcile(&points, classification, payload)
    }

    #[test]
    fn reporting_identity_comes_from_discovery() {
        let payload = DiscoveryPayload::new(vec![device(
            "bacnet:1",
            "AHU-1",
            "g-1",
            &[("analog-input_1", units("degrees-fahrenheit"))],
        )]);
        let out = run(&[row("AHU-1", "supply_air_temperature_sensor", "DEV:1", ("AI", "1"), "")], &payload);

        assert_eq!(out.site.building_code, "B");
        assert_eq!(out.site.guid, Slot::Present("site-guid".into()));
        let entity = &out.entities[0];
        assert_eq!(entity.code, Slot::Present("AHU-1".into()));
        assert_eq!(entity.guid, Slot::Present("g-1".into()));
        assert_eq!(entity.cloud_device_id, Slot::Present("cloud-AHU-1".into()));

        let field = &out.fields[0];
        assert_eq!(field.entity_code, Slot::Present("AHU-1".into()));
        assert_eq!(field.reporting_entity_guid, Slot::Present("g-1".into()));
        assert_eq!(field.reporting_entity_field, "supply_air_temperature_sensor");
        assert_eq!(field.raw_unit_path.as_deref(), Some("data.analog-input_1.units"));
        assert_eq!(field.standard_unit_value.as_deref(), Some("degrees_fahrenheit"));
        assert!(!field.units_mismatch);
        assert!(out.notes.is_empty(), "{:?}", out.notes);
    }

    #[test]
    fn missing_objects_are_logged_not_fatal() {
        let payload = DiscoveryPayload::new(vec![device("DEV:1", "AHU-1", "g-1", &[])]);
        let out = run(&[row("AHU-1", "supply_air_temperature_sensor", "DEV:1", ("AI", "4"), "")], &payload);
        assert_eq!(out.notes, vec!["Required object missing in discovery: DEV:1, data.analog-input_4.present-value"]);
        assert_eq!(out.fields[0].raw_unit_value.as_deref(), Some("degrees-fahrenheit"));
    }

    #[test]
    fn blank_object_name_falls_back_to_discovery() {
        let named = DiscoveredPoint { object_name: Some("ZN-T BMS".into()), ..units("degrees-celsius") };
        let payload = DiscoveryPayload::new(vec![device("DEV:1", "AHU-1", "g-1", &[("analog-input_1", named)])]);
        let mut record = row("AHU-1", "zone_air_temperature_sensor", "DEV:1", ("AI", "1"), "");

        let out = run(&[record.clone()], &payload);
        assert_eq!(out.fields[0].object_name, "ZN-T BMS");
        assert!(out.fields[0].units_mismatch);

        record.object_name = "ZN-T".into();
        let out = run(&[record], &payload);
        assert_eq!(out.fields[0].object_name, "ZN-T");
    }

    #[test]
    fn stateful_fields_clear_units_and_explode_states() {
        let binary = DiscoveredPoint {
            active_text: Some("On".into()),
            inactive_text: Some("Off".into()),
            units: Some("no-units".into()),
            ..DiscoveredPoint::default()
        };
        let multi = DiscoveredPoint {
            state_text: Some(StateText::List(vec!["Auto".into(), "Heat".into(), "Cool".into()])),
            ..DiscoveredPoint::default()
        };
        let payload = DiscoveryPayload::new(vec![device(
            "DEV:1",
            "AHU-1",
            "g-1",
            &[("binary-value_1", binary), ("multi-state-value_2", multi)],
        )]);
        let out = run(
            &[
                row("AHU-1", "supply_fan_run_command", "DEV:1", ("BV", "1"), "no_units"),
                row("AHU-1", "zone_conditioning_mode", "DEV:1", ("MSV", "2"), ""),
            ],
            &payload,
        );

        let run_cmd = &out.fields[0];
        assert_eq!(run_cmd.object_class, ObjectClass::from_code("BV"));
        assert_eq!((run_cmd.raw_unit_path.clone(), run_cmd.standard_unit_value.clone()), (None, None));

        let rows: Vec<(&str, &str, Option<&str>, Option<&str>)> = out
            .states
            .iter()
            .map(|s| {
                (s.reporting_entity_field.as_str(), s.raw_state.as_str(), s.raw_state_value.as_deref(), s.standard_state.as_deref())
            })
            .collect();
        assert_eq!(
            rows,
            vec![
                ("supply_fan_run_command", "active", None, Some("ON")),
                ("supply_fan_run_command", "inactive", None, Some("OFF")),
                ("zone_conditioning_mode", "1", Some("Auto"), None),
                ("zone_conditioning_mode", "2", Some("Heat"), None),
                ("zone_conditioning_mode", "3", Some("Cool"), None),
            ]
        );
    }

    #[test]
    fn undiscovered_stateful_field_gets_placeholder_pair() {
        let out = run(&[row("AHU-1", "filter_alarm", "DEV:1", ("BI", "5"), "")], &DiscoveryPayload::default());
        let raw: Vec<(&str, Option<&str>)> =
            out.states.iter().map(|s| (s.raw_state.as_str(), s.standard_state.as_deref())).collect();
        assert_eq!(raw, vec![("active", Some("ACTIVE")), ("inactive", Some("INACTIVE"))]);
        assert_eq!(out.states[0].reporting_entity_guid, Slot::PlaceholderPendingReview("MISSING GUID: DEV:1".into()));
    }

    #[test]
    fn site_falls_back_to_loadsheet_building() {
        let out = run(&[row("AHU-1", "filter_alarm", "DEV:1", ("BI", "5"), "")], &DiscoveryPayload::default());
        assert_eq!(out.site.building_code, "B");
        assert_eq!(out.site.guid, Slot::MissingInSource);
    }
}
