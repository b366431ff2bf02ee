//! Loadsheet intake: the validation boundary in front of the engine.
//!
//! Intake turns raw loadsheet records into [`Point`]s the later stages can
//! trust:
//!
//! ```text
//! records ─ trim + lint ─ required=YES ─ flags/object types ─┐
//!                                                            v
//!               stable sort (assetName, standardFieldName) ──┤
//!               deviceId forward/backward fill per asset ────┤
//!               duplicate-field notes, typeName check ───────┴─▶ Vec<Point>
//! ```
//!
//! Structural problems are returned as [`AbelError`]s. Lint findings are
//! returned as notes and end up in the log table.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::rules::units::helpers::same_unit;
use crate::{AbelError, LoadsheetRecord, ObjectClass};

/// A loadsheet object reference (`AI` + `3`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ObjectRef {
    pub code: String,
    pub class: ObjectClass,
    pub id: u64,
}

impl ObjectRef {
    fn kind(&self) -> &'static str {
        // `from_code` only yields classes with a kind.
        self.class.kind().unwrap_or("unknown")
    }

    pub(crate) fn raw_field_name(&self) -> String {
        format!("data.{}_{}.present-value", self.kind(), self.id)
    }

    pub(crate) fn raw_unit_path(&self) -> String {
        format!("data.{}_{}.units", self.kind(), self.id)
    }

    pub(crate) fn label(&self) -> String {
        format!("{}:{}", self.code, self.id)
    }
}

/// A required loadsheet row after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Point {
    /// 1-based position in the loadsheet.
    pub row: usize,
    pub building: String,
    pub device_id: String,
    pub asset_name: String,
    pub asset_path: String,
    pub type_name: String,
    pub standard_field_name: String,
    pub control_program: String,
    pub object_name: String,
    /// `None` for points the loadsheet declares missing.
    pub object: Option<ObjectRef>,
    pub declared_unit: Option<String>,
}

impl Point {
    pub(crate) fn is_missing(&self) -> bool {
        self.object.is_none()
    }

    pub(crate) fn raw_field_name(&self) -> Option<String> {
        self.object.as_ref().map(ObjectRef::raw_field_name)
    }
}

#[derive(Debug, Default)]
pub(crate) struct Intake {
    pub points: Vec<Point>,
    pub notes: Vec<String>,
}

pub(crate) fn intake(records: &[LoadsheetRecord]) -> Result<Intake, AbelError> {
    let mut notes = Vec::new();
    let mut points = Vec::new();

    for (idx, record) in records.iter().enumerate() {
        let row = idx + 1;
        let mut record = record.clone();
        for (column, cell) in cells_mut(&mut record) {
            let trimmed = cell.trim();
            if trimmed.len() != cell.len() {
                notes.push(format!("Row {row}: leading or trailing whitespace in '{column}'"));
                *cell = trimmed.to_string();
            }
        }

        match record.required.to_ascii_uppercase().as_str() {
            "YES" => {}
            "NO" | "" => continue,
            _ => return Err(AbelError::InvalidRequiredFlag { row, value: record.required }),
        }

        let missing = match record.is_missing.to_ascii_uppercase().as_str() {
            "YES" => true,
            "NO" | "" => false,
            _ => return Err(AbelError::InvalidMissingFlag { row, value: record.is_missing }),
        };

        points.push(validate_row(row, record, missing, &mut notes)?);
    }

    points.sort_by(|a, b| {
        a.asset_name.cmp(&b.asset_name).then_with(|| a.standard_field_name.cmp(&b.standard_field_name))
    });

    fill_device_ids(&mut points)?;
    note_repeated_fields(&points, &mut notes);
    unify_type_names(&mut points)?;

    let buildings: BTreeSet<&str> =
        points.iter().map(|p| p.building.as_str()).filter(|b| !b.is_empty()).collect();
    if buildings.len() > 1 {
        let list: Vec<&str> = buildings.into_iter().collect();
        notes.push(format!("Loadsheet spans more than one building: {}", list.join(", ")));
    }

    debug!(points = points.len(), notes = notes.len(), "intake finished");
    Ok(Intake { points, notes })
}

fn validate_row(row: usize, record: LoadsheetRecord, missing: bool, notes: &mut Vec<String>) -> Result<Point, AbelError> {
    if record.standard_field_name.is_empty() {
        return Err(AbelError::BlankColumn { row, column: "standardFieldName" });
    }

    let derived = (!record.building.is_empty() && !record.general_type.is_empty() && !record.asset_name.is_empty())
        .then(|| format!("{}:{}:{}", record.building, record.general_type, record.asset_name));
    let asset_path = match (&derived, record.full_asset_path.is_empty()) {
        (_, false) => {
            if let Some(expected) = derived.as_deref().filter(|d| *d != record.full_asset_path) {
                notes.push(format!(
                    "Row {row}: fullAssetPath '{}' does not match building:generalType:assetName '{expected}'",
                    record.full_asset_path
                ));
            }
            record.full_asset_path.clone()
        }
        (Some(derived), true) => derived.clone(),
        (None, true) => return Err(AbelError::BlankColumn { row, column: "fullAssetPath" }),
    };

    let field = record.standard_field_name.as_str();
    if !regex!(r"^[a-z][a-z0-9]*(?:_[a-z][a-z0-9]*)*(?:_[0-9]+)*$").is_match(field) {
        notes.push(format!("Row {row}: standardFieldName '{field}' is not a well-formed field name"));
    }
    if field.contains("alarm") && !record.point_type.eq_ignore_ascii_case("BALM") {
        notes.push(format!("Row {row}: alarm field '{field}' has type '{}', expected 'BALM'", record.point_type));
    }

    let object = if missing {
        let populated: Vec<&str> = [("deviceId", &record.device_id), ("objectType", &record.object_type), ("objectId", &record.object_id)]
            .into_iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(c, _)| c)
            .collect();
        if !populated.is_empty() {
            notes.push(format!("Row {row}: point is marked missing but has {} populated", populated.join(", ")));
        }
        None
    } else {
        let object = parse_object(row, &record)?;
        lint_object_type(row, field, &object, notes);
        Some(object)
    };

    let declared_unit = Some(record.units.clone()).filter(|u| !u.is_empty());
    if let (Some(declared), Some(expected)) = (&declared_unit, crate::rules::expected_unit(field)) {
        let stateful = object.as_ref().is_some_and(|o| o.class.is_stateful());
        if !stateful && !same_unit(declared, expected) {
            notes.push(format!("Row {row}: declared units '{declared}' for '{field}' differ from expected '{expected}'"));
        }
    }

    Ok(Point {
        row,
        building: record.building,
        device_id: record.device_id,
        asset_name: record.asset_name,
        asset_path,
        type_name: record.type_name,
        standard_field_name: record.standard_field_name,
        control_program: record.control_program,
        object_name: record.object_name,
        object,
        declared_unit,
    })
}

fn parse_object(row: usize, record: &LoadsheetRecord) -> Result<ObjectRef, AbelError> {
    if record.object_type.is_empty() {
        return Err(AbelError::BlankColumn { row, column: "objectType" });
    }
    if record.object_id.is_empty() {
        return Err(AbelError::BlankColumn { row, column: "objectId" });
    }
    let class = ObjectClass::from_code(&record.object_type)
        .ok_or_else(|| AbelError::UnknownObjectType { row, object_type: record.object_type.clone() })?;
    let id = record
        .object_id
        .parse::<u64>()
        .map_err(|_| AbelError::InvalidObjectId { row, object_id: record.object_id.clone() })?;
    Ok(ObjectRef { code: record.object_type.to_ascii_uppercase(), class, id })
}

const DISCRETE_KEYWORDS: [&str; 6] =
    ["run_command", "run_status", "damper_command", "damper_status", "valve_command", "valve_status"];
const MEASURED_SUFFIXES: [&str; 4] = ["_sensor", "_setpoint", "_count", "_percentage"];

fn lint_object_type(row: usize, field: &str, object: &ObjectRef, notes: &mut Vec<String>) {
    if DISCRETE_KEYWORDS.iter().any(|k| field.contains(k)) && !object.class.is_stateful() {
        notes.push(format!("Row {row}: '{field}' should be a binary or multi-state object, found '{}'", object.code));
    } else if MEASURED_SUFFIXES.iter().any(|s| field.contains(s)) && !object.class.is_analog() {
        notes.push(format!("Row {row}: '{field}' should be an analog object, found '{}'", object.code));
    }
}

/// Missing points never carry a device of their own; every point inherits the
/// nearest earlier device id on its asset, else the nearest later one.
fn fill_device_ids(points: &mut [Point]) -> Result<(), AbelError> {
    let mut by_asset: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (idx, point) in points.iter().enumerate() {
        by_asset.entry(point.asset_path.clone()).or_default().push(idx);
    }

    for (asset_path, indices) in by_asset {
        let mut last: Option<String> = None;
        for &idx in &indices {
            if points[idx].device_id.is_empty() {
                if let Some(device) = &last {
                    points[idx].device_id = device.clone();
                }
            } else {
                last = Some(points[idx].device_id.clone());
            }
        }

        let mut next: Option<String> = None;
        for &idx in indices.iter().rev() {
            if points[idx].device_id.is_empty() {
                if let Some(device) = &next {
                    points[idx].device_id = device.clone();
                }
            } else {
                next = Some(points[idx].device_id.clone());
            }
        }

        if next.is_none() {
            return Err(AbelError::AssetWithoutDevice { asset_path });
        }
    }
    Ok(())
}

/// A repeated standard field name on one asset is enumerated like any other
/// repeat in its reporting scope; it is only reported.
fn note_repeated_fields(points: &[Point], notes: &mut Vec<String>) {
    let mut rows: BTreeMap<(&str, &str), Vec<usize>> = BTreeMap::new();
    for point in points {
        rows.entry((&point.asset_path, &point.standard_field_name)).or_default().push(point.row);
    }
    for ((asset_path, field), mut rows) in rows.into_iter().filter(|(_, rows)| rows.len() > 1) {
        rows.sort_unstable();
        let rows: Vec<String> = rows.iter().map(usize::to_string).collect();
        notes.push(format!("Asset '{asset_path}' declares '{field}' on more than one row: {}", rows.join(", ")));
    }
}

/// Blank typeName cells inherit the asset's single declared type name.
fn unify_type_names(points: &mut [Point]) -> Result<(), AbelError> {
    let mut declared: BTreeMap<String, (usize, BTreeSet<String>)> = BTreeMap::new();
    for point in points.iter() {
        let entry = declared.entry(point.asset_path.clone()).or_insert_with(|| (point.row, BTreeSet::new()));
        if !point.type_name.is_empty() {
            entry.1.insert(point.type_name.clone());
        }
    }

    for (asset_path, (first_row, names)) in &declared {
        match names.len() {
            0 => return Err(AbelError::BlankColumn { row: *first_row, column: "typeName" }),
            1 => {}
            _ => {
                return Err(AbelError::ConflictingTypeNames {
                    asset_path: asset_path.clone(),
                    type_names: names.iter().cloned().collect(),
                });
            }
        }
    }

    for point in points.iter_mut() {
        if let Some(name) = declared.get(&point.asset_path).and_then(|(_, names)| names.first()) {
            point.type_name = name.clone();
        }
    }
    Ok(())
}

fn cells_mut(record: &mut LoadsheetRecord) -> [(&'static str, &mut String); 19] {
    [
        ("location", &mut record.location),
        ("controlProgram", &mut record.control_program),
        ("name", &mut record.name),
        ("type", &mut record.point_type),
        ("path", &mut record.path),
        ("deviceId", &mut record.device_id),
        ("objectType", &mut record.object_type),
        ("objectId", &mut record.object_id),
        ("objectName", &mut record.object_name),
        ("units", &mut record.units),
        ("required", &mut record.required),
        ("isMissing", &mut record.is_missing),
        ("manuallyMapped", &mut record.manually_mapped),
        ("building", &mut record.building),
        ("generalType", &mut record.general_type),
        ("typeName", &mut record.type_name),
        ("assetName", &mut record.asset_name),
        ("fullAssetPath", &mut record.full_asset_path),
        ("standardFieldName", &mut record.standard_field_name),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(asset: &str, field: &str, device: &str, object: (&str, &str)) -> LoadsheetRecord {
        LoadsheetRecord {
            required: "YES".into(),
            is_missing: "NO".into(),
            building: "B".into(),
            general_type: "VAV".into(),
            type_name: "VAV_SD_DSP".into(),
            asset_name: asset.into(),
            full_asset_path: format!("B:VAV:{asset}"),
            standard_field_name: field.into(),
            device_id: device.into(),
            object_type: object.0.into(),
            object_id: object.1.into(),
            point_type: "AI".into(),
            ..LoadsheetRecord::default()
        }
    }

    fn missing_row(asset: &str, field: &str) -> LoadsheetRecord {
        LoadsheetRecord {
            is_missing: "YES".into(),
            object_type: String::new(),
            object_id: String::new(),
            ..row(asset, field, "", ("", ""))
        }
    }

    #[test]
    fn only_required_rows_participate_sorted_by_asset_and_field() {
        let mut skipped = row("VAV-0", "zone_air_temperature_sensor", "DEV:9", ("AI", "1"));
        skipped.required = "NO".into();
        let records = vec![
            row("VAV-2", "zone_air_temperature_sensor", "DEV:1", ("AI", "3")),
            skipped,
            row("VAV-1", "supply_air_flowrate_sensor", "DEV:1", ("AI", "2")),
            row("VAV-1", "discharge_air_temperature_sensor", "DEV:1", ("AI", "1")),
        ];

        let out = intake(&records).unwrap();
        let order: Vec<(&str, &str)> =
            out.points.iter().map(|p| (p.asset_name.as_str(), p.standard_field_name.as_str())).collect();
        assert_eq!(
            order,
            vec![
                ("VAV-1", "discharge_air_temperature_sensor"),
                ("VAV-1", "supply_air_flowrate_sensor"),
                ("VAV-2", "zone_air_temperature_sensor"),
            ]
        );
        assert_eq!(out.points[0].raw_field_name().as_deref(), Some("data.analog-input_1.present-value"));
        assert_eq!(
            out.points[0].object.as_ref().map(ObjectRef::raw_unit_path).as_deref(),
            Some("data.analog-input_1.units")
        );
    }

    #[test]
    fn missing_points_inherit_device_forward_then_backward() {
        let records = vec![
            missing_row("AHU-1", "a_sensor"),
            row("AHU-1", "b_sensor", "DEV:7", ("AI", "1")),
            missing_row("AHU-1", "c_sensor"),
        ];
        let out = intake(&records).unwrap();
        assert!(out.points.iter().all(|p| p.device_id == "DEV:7"));
        assert!(out.points[0].is_missing());
        assert_eq!(out.points[0].raw_field_name(), None);
    }

    #[test]
    fn asset_without_any_device_is_rejected() {
        let records = vec![missing_row("AHU-1", "a_sensor")];
        assert!(matches!(intake(&records), Err(AbelError::AssetWithoutDevice { asset_path }) if asset_path == "B:VAV:AHU-1"));
    }

    #[test]
    fn structural_problems_are_fatal() {
        let mut bad_flag = row("A", "x_sensor", "DEV:1", ("AI", "1"));
        bad_flag.required = "MAYBE".into();
        assert!(matches!(intake(&[bad_flag]), Err(AbelError::InvalidRequiredFlag { row: 1, .. })));

        let unknown = row("A", "x_sensor", "DEV:1", ("ZZ", "1"));
        assert!(matches!(intake(&[unknown]), Err(AbelError::UnknownObjectType { .. })));

        let bad_id = row("A", "x_sensor", "DEV:1", ("AI", "one"));
        assert!(matches!(intake(&[bad_id]), Err(AbelError::InvalidObjectId { .. })));

        let mut other_type = row("A", "y_sensor", "DEV:1", ("AI", "2"));
        other_type.type_name = "VAV_OTHER".into();
        let conflicting = vec![row("A", "x_sensor", "DEV:1", ("AI", "1")), other_type];
        assert!(matches!(intake(&conflicting), Err(AbelError::ConflictingTypeNames { .. })));
    }

    #[test]
    fn repeated_field_on_one_asset_is_kept_and_noted() {
        let records = vec![
            row("AHU-1", "zone_air_temperature_sensor", "DEV:1", ("AI", "2")),
            row("AHU-1", "supply_air_temperature_sensor", "DEV:1", ("AI", "3")),
            row("AHU-1", "zone_air_temperature_sensor", "DEV:1", ("AI", "1")),
        ];
        let out = intake(&records).unwrap();
        assert_eq!(out.points.len(), 3);
        assert_eq!(
            out.notes,
            vec!["Asset 'B:VAV:AHU-1' declares 'zone_air_temperature_sensor' on more than one row: 1, 3"]
        );
    }

    #[test]
    fn blank_full_asset_path_is_derived() {
        let mut record = row("VAV-3", "zone_air_temperature_sensor", "DEV:1", ("AI", "1"));
        record.full_asset_path = String::new();
        let out = intake(&[record]).unwrap();
        assert_eq!(out.points[0].asset_path, "B:VAV:VAV-3");
    }

    #[test]
    fn lint_findings_become_notes() {
        let mut spaced = row("VAV-1", "zone_air_temperature_sensor", " DEV:1", ("AI", "1"));
        spaced.units = "degrees_celsius".into();
        let mut wrong_path = row("VAV-1", "Bad-Name", "DEV:1", ("BV", "2"));
        wrong_path.full_asset_path = "B:VAV:ELSEWHERE".into();
        let alarm = row("VAV-1", "filter_alarm", "DEV:1", ("BI", "3"));
        let analog_run = row("VAV-1", "supply_fan_run_command", "DEV:1", ("AO", "4"));

        let out = intake(&[spaced, wrong_path, alarm, analog_run]).unwrap();
        let notes = out.notes.join("\n");
        assert!(notes.contains("Row 1: leading or trailing whitespace in 'deviceId'"), "{notes}");
        assert!(notes.contains("declared units 'degrees_celsius'"), "{notes}");
        assert!(notes.contains("Row 2: fullAssetPath 'B:VAV:ELSEWHERE'"), "{notes}");
        assert!(notes.contains("'Bad-Name' is not a well-formed field name"), "{notes}");
        assert!(notes.contains("Row 3: alarm field 'filter_alarm' has type 'AI'"), "{notes}");
        assert!(notes.contains("Row 4: 'supply_fan_run_command' should be a binary or multi-state object"), "{notes}");
        assert_eq!(out.points.iter().find(|p| p.row == 1).map(|p| p.device_id.as_str()), Some("DEV:1"));
    }
}
