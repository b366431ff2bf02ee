//! Typed input records and their structural parsing.
//!
//! Three inputs feed a run:
//!
//! - the loadsheet, a JSON array of point records authored by an engineer,
//! - the discovery payload, a JSON array with one record per deployed device,
//! - an optional prior configuration, a YAML mapping of guid to entry.
//!
//! Parsing here is purely structural. Row-level semantics (flags, object
//! types, fill rules) live in `engine/intake.rs`.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use serde_yaml::Value as YamlValue;
use tracing::debug;

use crate::AbelError;

/// Columns every loadsheet record must carry, even when blank.
pub(crate) const LOADSHEET_COLUMNS: [&str; 19] = [
    "location",
    "controlProgram",
    "name",
    "type",
    "path",
    "deviceId",
    "objectType",
    "objectId",
    "objectName",
    "units",
    "required",
    "isMissing",
    "manuallyMapped",
    "building",
    "generalType",
    "typeName",
    "assetName",
    "fullAssetPath",
    "standardFieldName",
];

// --- Loadsheet ----------------------------------------------------------------

/// One loadsheet row. Every cell is kept as text; blank cells are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadsheetRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub location: String,
    #[serde(deserialize_with = "lenient_string")]
    pub control_program: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(rename = "type", deserialize_with = "lenient_string")]
    pub point_type: String,
    #[serde(deserialize_with = "lenient_string")]
    pub path: String,
    #[serde(deserialize_with = "lenient_string")]
    pub device_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub object_type: String,
    #[serde(deserialize_with = "lenient_string")]
    pub object_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub object_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub units: String,
    #[serde(deserialize_with = "lenient_string")]
    pub required: String,
    #[serde(deserialize_with = "lenient_string")]
    pub is_missing: String,
    #[serde(deserialize_with = "lenient_string")]
    pub manually_mapped: String,
    #[serde(deserialize_with = "lenient_string")]
    pub building: String,
    #[serde(deserialize_with = "lenient_string")]
    pub general_type: String,
    #[serde(deserialize_with = "lenient_string")]
    pub type_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub asset_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub full_asset_path: String,
    #[serde(deserialize_with = "lenient_string")]
    pub standard_field_name: String,
}

/// The full loadsheet in authoring order.
#[derive(Debug, Clone, Default)]
pub struct Loadsheet {
    pub records: Vec<LoadsheetRecord>,
}

impl Loadsheet {
    pub fn new(records: Vec<LoadsheetRecord>) -> Self {
        Self { records }
    }

    /// Parse a JSON array of loadsheet records.
    ///
    /// Every record must carry all loadsheet columns. A record lacking one is
    /// a structural error and aborts the run.
    pub fn from_json(text: &str) -> Result<Self, AbelError> {
        let value: Value = serde_json::from_str(text).map_err(AbelError::LoadsheetJson)?;
        let Value::Array(rows) = value else {
            return Err(AbelError::LoadsheetShape);
        };

        let mut records = Vec::with_capacity(rows.len());
        for (idx, row) in rows.into_iter().enumerate() {
            let Value::Object(map) = &row else {
                return Err(AbelError::LoadsheetShape);
            };
            let missing: Vec<String> =
                LOADSHEET_COLUMNS.iter().filter(|c| !map.contains_key(**c)).map(|c| c.to_string()).collect();
            if !missing.is_empty() {
                return Err(AbelError::MissingColumns { row: idx + 1, columns: missing });
            }
            records.push(serde_json::from_value(row).map_err(AbelError::LoadsheetJson)?);
        }

        debug!(rows = records.len(), "parsed loadsheet");
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// --- Discovery payload --------------------------------------------------------

/// State text reported by a multi-state object: usually a list, sometimes a
/// single string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StateText {
    List(Vec<String>),
    Text(String),
}

/// Descriptor of one object exposed by a device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DiscoveredPoint {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub units: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub active_text: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub inactive_text: Option<String>,
    #[serde(default)]
    pub state_text: Option<StateText>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub object_name: Option<String>,
}

/// What discovery reported for one device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryRecord {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub cloud_device_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub entity_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub entity_guid: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub building: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub building_guid: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub device_id: Option<String>,
    /// Raw object key (`analog-input_1` or `data.analog-input_1.present-value`)
    /// to descriptor.
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: BTreeMap<String, DiscoveredPoint>,
}

impl DiscoveryRecord {
    /// Device id in loadsheet form: `bacnet:12` becomes `DEV:12`.
    pub fn normalized_device_id(&self) -> Option<String> {
        self.device_id.as_deref().map(normalize_device_id)
    }

    /// Points keyed by their fully qualified raw field name.
    pub fn points(&self) -> impl Iterator<Item = (String, &DiscoveredPoint)> + '_ {
        self.data.iter().map(|(key, point)| (canonical_field_name(key), point))
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiscoveryPayload {
    pub records: Vec<DiscoveryRecord>,
}

impl DiscoveryPayload {
    pub fn new(records: Vec<DiscoveryRecord>) -> Self {
        Self { records }
    }

    pub fn from_json(text: &str) -> Result<Self, AbelError> {
        let records: Vec<DiscoveryRecord> = serde_json::from_str(text).map_err(AbelError::PayloadJson)?;
        debug!(devices = records.len(), "parsed discovery payload");
        Ok(Self { records })
    }
}

pub(crate) fn normalize_device_id(raw: &str) -> String {
    let raw = raw.trim();
    match raw.strip_prefix("bacnet:") {
        Some(rest) => format!("DEV:{rest}"),
        None => raw.to_string(),
    }
}

/// Qualify a discovery object key as `data.<kind>_<id>.present-value`.
pub(crate) fn canonical_field_name(key: &str) -> String {
    let key = key.trim();
    if let Some(caps) = regex!(r"^(?:data\.)?([A-Za-z-]+)_(\d+)(?:\.present-value)?$").captures(key) {
        return format!("data.{}_{}.present-value", caps[1].to_ascii_lowercase(), &caps[2]);
    }
    let bare = key.strip_prefix("data.").unwrap_or(key);
    let bare = bare.strip_suffix(".present-value").unwrap_or(bare);
    format!("data.{bare}.present-value")
}

// --- Prior configuration ------------------------------------------------------

/// One entry of a previously published configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorEntry {
    pub etag: Option<String>,
    pub code: Option<String>,
    /// True when the entry carries links, which marks a virtual entity.
    pub linked: bool,
}

/// Previously published configuration keyed by guid.
#[derive(Debug, Clone, Default)]
pub struct PriorConfig {
    pub entries: BTreeMap<String, PriorEntry>,
}

impl PriorConfig {
    pub fn new(entries: BTreeMap<String, PriorEntry>) -> Self {
        Self { entries }
    }

    /// Parse a YAML mapping of guid to `{etag, code?, links?}`.
    ///
    /// Entries that are not mappings (metadata blocks and the like) are
    /// skipped. Numeric etags are kept as their decimal text.
    pub fn from_yaml(text: &str) -> Result<Self, AbelError> {
        let doc: YamlValue = serde_yaml::from_str(text).map_err(AbelError::PriorYaml)?;
        let mapping = match doc {
            YamlValue::Null => return Ok(Self::default()),
            YamlValue::Mapping(mapping) => mapping,
            _ => return Err(AbelError::PriorShape),
        };

        let mut entries = BTreeMap::new();
        for (key, value) in mapping {
            let (Some(guid), YamlValue::Mapping(fields)) = (yaml_scalar(&key), value) else {
                continue;
            };
            let entry = PriorEntry {
                etag: fields.get("etag").and_then(yaml_scalar),
                code: fields.get("code").and_then(yaml_scalar),
                linked: fields.get("links").is_some_and(yaml_truthy),
            };
            entries.insert(guid, entry);
        }

        debug!(entries = entries.len(), "parsed prior configuration");
        Ok(Self { entries })
    }

    pub fn get(&self, guid: &str) -> Option<&PriorEntry> {
        self.entries.get(guid)
    }

    /// Prior virtual entities as `(guid, entry)`, in guid order.
    pub fn virtual_entries(&self) -> impl Iterator<Item = (&str, &PriorEntry)> {
        self.entries.iter().filter(|(_, e)| e.linked && e.code.is_some()).map(|(g, e)| (g.as_str(), e))
    }
}

fn yaml_scalar(value: &YamlValue) -> Option<String> {
    match value {
        YamlValue::String(s) => Some(s.clone()),
        YamlValue::Number(n) => Some(n.to_string()),
        YamlValue::Bool(b) => Some(b.to_string()),
        YamlValue::Tagged(tagged) => yaml_scalar(&tagged.value),
        _ => None,
    }
}

fn yaml_truthy(value: &YamlValue) -> bool {
    match value {
        YamlValue::Null => false,
        YamlValue::Bool(b) => *b,
        YamlValue::String(s) => !s.is_empty(),
        YamlValue::Sequence(seq) => !seq.is_empty(),
        YamlValue::Mapping(map) => !map.is_empty(),
        YamlValue::Number(_) => true,
        YamlValue::Tagged(tagged) => yaml_truthy(&tagged.value),
    }
}

// --- Lenient cells -----------------------------------------------------------

fn cell_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(match n.as_f64() {
            // Spreadsheet exports turn integer cells into `3.0`.
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        }),
        other => Some(other.to_string()),
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(cell_text(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(cell_text(Value::deserialize(deserializer)?).filter(|s| !s.trim().is_empty()))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
