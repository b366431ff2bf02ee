//! Error type for conversion runs.
//!
//! Only structural problems and global-invariant violations end up here. Gaps
//! between the two sources (a device missing from discovery, a unit that does
//! not match) are recorded as log entries and never abort a run.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AbelError {
    #[error("loadsheet is not valid JSON: {0}")]
    LoadsheetJson(#[source] serde_json::Error),

    #[error("loadsheet must be a JSON array of records")]
    LoadsheetShape,

    #[error("discovery payload is not valid JSON: {0}")]
    PayloadJson(#[source] serde_json::Error),

    #[error("prior configuration is not valid YAML: {0}")]
    PriorYaml(#[source] serde_yaml::Error),

    #[error("prior configuration must be a mapping of guid to entry")]
    PriorShape,

    /// Row numbers are 1-based positions in the loadsheet array.
    #[error("loadsheet row {row} is missing column(s): {}", .columns.join(", "))]
    MissingColumns { row: usize, columns: Vec<String> },

    #[error("loadsheet row {row}: required must be YES or NO, got '{value}'")]
    InvalidRequiredFlag { row: usize, value: String },

    #[error("loadsheet row {row}: isMissing must be YES or NO, got '{value}'")]
    InvalidMissingFlag { row: usize, value: String },

    #[error("loadsheet row {row}: column '{column}' is blank")]
    BlankColumn { row: usize, column: &'static str },

    #[error("loadsheet row {row}: unknown object type '{object_type}'")]
    UnknownObjectType { row: usize, object_type: String },

    #[error("loadsheet row {row}: object id '{object_id}' is not a non-negative integer")]
    InvalidObjectId { row: usize, object_id: String },

    #[error("asset '{asset_path}' has no device on any required row")]
    AssetWithoutDevice { asset_path: String },

    #[error("asset '{asset_path}' declares conflicting type names: {}", .type_names.join(", "))]
    ConflictingTypeNames { asset_path: String, type_names: Vec<String> },

    #[error("entity code '{code}' is assigned to more than one entity")]
    DuplicateEntityCode { code: String },

    #[error("reporting field '{field}' is assigned twice under reporting entity '{guid}'")]
    DuplicateReportingField { guid: String, field: String },

    #[error("failed to serialise report: {0}")]
    Output(#[source] serde_json::Error),

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
