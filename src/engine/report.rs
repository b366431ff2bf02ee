//! Projection of the reconciled model into output tables.
//!
//! The builder does no reconciliation of its own. It renders every [`Slot`]
//! into its table text, keeps the stage ordering, and refuses to emit a report
//! that breaks one of the two global uniqueness rules:
//!
//! - entity codes are unique across the entity table,
//! - `(reportingEntityGuid, reportingEntityField)` is unique across fields.

use std::collections::BTreeSet;

use serde::Serialize;

use super::stabilize::PriorVirtual;
use crate::{AbelError, Entity, EntityField, LogEntry, Site, State};

const UNITS_CHECK_MARKER: &str = "Incorrect units in BMS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteRow {
    pub building_code: String,
    pub entity_guid: String,
    pub etag: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRow {
    pub entity_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub entity_guid: String,
    pub is_existing: bool,
    pub etag: String,
    pub is_reporting: bool,
    pub cloud_device_id: String,
    pub namespace: String,
    pub general_type: String,
    pub entity_type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityFieldRow {
    pub entity_code: String,
    pub entity_guid: String,
    pub reporting_entity_code: String,
    pub reporting_entity_guid: String,
    pub reporting_entity_field: String,
    pub standard_field_name: String,
    pub raw_field_name: String,
    pub raw_unit_path: String,
    pub standard_unit_value: String,
    pub raw_unit_value: String,
    pub missing: bool,
    pub units_mismatch: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units_check: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateRow {
    pub reporting_entity_code: String,
    pub reporting_entity_guid: String,
    pub reporting_entity_field: String,
    pub standard_state: String,
    pub raw_state: String,
    pub raw_state_value: String,
}

/// Operator-facing view of a field whose device units disagree with the
/// declared units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncorrectUnitsRow {
    pub control_program: String,
    pub device_id: String,
    pub object_id: String,
    pub object_name: String,
    pub standard_field_name: String,
    pub current_units: String,
    pub correct_units: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingVirtualEntityRow {
    pub code: String,
    pub guid: String,
    pub etag: String,
}

/// The complete, immutable result of a conversion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub site: Vec<SiteRow>,
    pub entities: Vec<EntityRow>,
    pub entity_fields: Vec<EntityFieldRow>,
    pub states: Vec<StateRow>,
    pub log: Vec<LogEntry>,
    pub incorrect_units: Vec<IncorrectUnitsRow>,
    pub existing_virtual_entities: Vec<ExistingVirtualEntityRow>,
}

impl Report {
    pub fn to_json(&self) -> Result<String, AbelError> {
        serde_json::to_string_pretty(self).map_err(AbelError::Output)
    }
}

/// Everything the builder projects.
#[derive(Debug)]
pub(crate) struct ReportInput<'a> {
    pub site: &'a Site,
    pub entities: &'a [Entity],
    pub fields: &'a [EntityField],
    pub states: &'a [State],
    pub notes: Vec<String>,
    pub prior_virtuals: &'a [PriorVirtual],
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ReportBuilder {
    extended_columns: bool,
}

impl ReportBuilder {
    pub(crate) fn new(extended_columns: bool) -> Self {
        Self { extended_columns }
    }

    pub(crate) fn build(&self, input: ReportInput<'_>) -> Result<Report, AbelError> {
        check_entity_codes(input.entities)?;
        check_reporting_fields(input.fields)?;

        let extended = self.extended_columns;
        let site = vec![SiteRow {
            building_code: input.site.building_code.clone(),
            entity_guid: input.site.guid.project(),
            etag: input.site.etag.project(),
        }];

        let entities = input
            .entities
            .iter()
            .map(|e| EntityRow {
                entity_code: e.code.project(),
                display_name: extended.then(|| e.display_name.clone().unwrap_or_default()),
                entity_guid: e.guid.project(),
                is_existing: e.is_existing,
                etag: e.etag.project(),
                is_reporting: e.is_reporting(),
                cloud_device_id: e.cloud_device_id.project(),
                namespace: e.namespace.as_str().to_string(),
                general_type: e.general_type.clone(),
                entity_type_name: e.type_name.clone(),
                device_id: extended.then(|| e.device.device_id().unwrap_or_default().to_string()),
            })
            .collect();

        let entity_fields = input
            .fields
            .iter()
            .map(|f| EntityFieldRow {
                entity_code: f.entity_code.project(),
                entity_guid: f.entity_guid.project(),
                reporting_entity_code: f.reporting_entity_code.project(),
                reporting_entity_guid: f.reporting_entity_guid.project(),
                reporting_entity_field: f.reporting_entity_field.clone(),
                standard_field_name: f.standard_field_name.clone(),
                raw_field_name: f.raw_field_name.clone().unwrap_or_default(),
                raw_unit_path: f.raw_unit_path.clone().unwrap_or_default(),
                standard_unit_value: f.standard_unit_value.clone().unwrap_or_default(),
                raw_unit_value: f.raw_unit_value.clone().unwrap_or_default(),
                missing: f.missing,
                units_mismatch: f.units_mismatch,
                units_check: extended
                    .then(|| if f.units_mismatch { UNITS_CHECK_MARKER.to_string() } else { String::new() }),
            })
            .collect();

        let states = input
            .states
            .iter()
            .map(|s| StateRow {
                reporting_entity_code: s.reporting_entity_code.project(),
                reporting_entity_guid: s.reporting_entity_guid.project(),
                reporting_entity_field: s.reporting_entity_field.clone(),
                standard_state: s.standard_state.clone().unwrap_or_default(),
                raw_state: s.raw_state.clone(),
                raw_state_value: s.raw_state_value.clone().unwrap_or_default(),
            })
            .collect();

        let log = input
            .notes
            .into_iter()
            .enumerate()
            .map(|(idx, message)| LogEntry { index: idx + 1, message })
            .collect();

        let mut incorrect_units: Vec<IncorrectUnitsRow> = Vec::new();
        for field in input.fields.iter().filter(|f| f.units_mismatch) {
            let row = IncorrectUnitsRow {
                control_program: field.control_program.clone(),
                device_id: field.device_id.clone(),
                object_id: field.object_ref.clone().unwrap_or_default(),
                object_name: field.object_name.clone(),
                standard_field_name: field.standard_field_name.clone(),
                current_units: field.discovered_unit.clone().unwrap_or_default(),
                correct_units: field.standard_unit_value.clone().unwrap_or_default(),
            };
            if !incorrect_units.contains(&row) {
                incorrect_units.push(row);
            }
        }

        let existing_virtual_entities = input
            .prior_virtuals
            .iter()
            .map(|v| ExistingVirtualEntityRow { code: v.code.clone(), guid: v.guid.clone(), etag: v.etag.project() })
            .collect();

        Ok(Report { site, entities, entity_fields, states, log, incorrect_units, existing_virtual_entities })
    }
}

fn check_entity_codes(entities: &[Entity]) -> Result<(), AbelError> {
    let mut seen = BTreeSet::new();
    for entity in entities {
        let code = entity.code.project();
        if !seen.insert(code.clone()) {
            return Err(AbelError::DuplicateEntityCode { code });
        }
    }
    Ok(())
}

fn check_reporting_fields(fields: &[EntityField]) -> Result<(), AbelError> {
    let mut seen = BTreeSet::new();
    for field in fields {
        let guid = field.reporting_entity_guid.project();
        if !seen.insert((guid.clone(), field.reporting_entity_field.as_str())) {
            return Err(AbelError::DuplicateReportingField { guid, field: field.reporting_entity_field.clone() });
        }
    }
    Ok(())
}
