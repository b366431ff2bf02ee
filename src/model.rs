//! Entities, fields and states produced by a conversion run.
//!
//! Identity-bearing values are [`Slot`]s so that a placeholder such as
//! `MISSING GUID: DEV:4` can never be mistaken for a guid that came from a
//! source.

use serde::Serialize;

use crate::Slot;

bitflags::bitflags! {
    /// Classification of a BACnet object type code.
    ///
    /// Every known code sets exactly one of `ANALOG`/`BINARY`/`MULTI_STATE`
    /// and exactly one of `INPUT`/`OUTPUT`/`VALUE`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ObjectClass: u8 {
        const ANALOG      = 1 << 0;
        const BINARY      = 1 << 1;
        const MULTI_STATE = 1 << 2;
        const INPUT       = 1 << 3;
        const OUTPUT      = 1 << 4;
        const VALUE       = 1 << 5;

        /// Objects that report discrete states instead of engineering units.
        const STATEFUL    = Self::BINARY.bits() | Self::MULTI_STATE.bits();
    }
}

impl ObjectClass {
    /// Parse a loadsheet object type code such as `AI` or `msv`.
    pub fn from_code(code: &str) -> Option<Self> {
        let class = match code.trim().to_ascii_uppercase().as_str() {
            "AI" => Self::ANALOG | Self::INPUT,
            "AO" => Self::ANALOG | Self::OUTPUT,
            "AV" => Self::ANALOG | Self::VALUE,
            "BI" => Self::BINARY | Self::INPUT,
            "BO" => Self::BINARY | Self::OUTPUT,
            "BV" => Self::BINARY | Self::VALUE,
            "MSI" => Self::MULTI_STATE | Self::INPUT,
            "MSO" => Self::MULTI_STATE | Self::OUTPUT,
            "MSV" => Self::MULTI_STATE | Self::VALUE,
            _ => return None,
        };
        Some(class)
    }

    /// Object kind as it appears in discovery keys, e.g. `analog-input`.
    pub fn kind(self) -> Option<&'static str> {
        let family = if self.contains(Self::ANALOG) {
            "analog"
        } else if self.contains(Self::BINARY) {
            "binary"
        } else if self.contains(Self::MULTI_STATE) {
            "multi-state"
        } else {
            return None;
        };
        let role = if self.contains(Self::INPUT) {
            "input"
        } else if self.contains(Self::OUTPUT) {
            "output"
        } else if self.contains(Self::VALUE) {
            "value"
        } else {
            return None;
        };
        Some(match (family, role) {
            ("analog", "input") => "analog-input",
            ("analog", "output") => "analog-output",
            ("analog", "value") => "analog-value",
            ("binary", "input") => "binary-input",
            ("binary", "output") => "binary-output",
            ("binary", "value") => "binary-value",
            ("multi-state", "input") => "multi-state-input",
            ("multi-state", "output") => "multi-state-output",
            _ => "multi-state-value",
        })
    }

    pub fn is_stateful(self) -> bool {
        self.intersects(Self::STATEFUL)
    }

    pub fn is_analog(self) -> bool {
        self.contains(Self::ANALOG)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    Hvac,
    Gateways,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Hvac => "HVAC",
            Namespace::Gateways => "GATEWAYS",
        }
    }
}

/// How an entity came to exist.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    /// Reporting entity carrying fields for several logical assets.
    Passthrough,
    /// Reporting entity whose device and asset coincide.
    Direct { asset_path: String },
    /// Logical asset with no device identity of its own.
    Virtual { asset_path: String },
}

/// Device an entity joins against in discovery.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceLink {
    Device(String),
    /// Never matches a discovery record.
    Detached,
}

impl DeviceLink {
    pub fn device_id(&self) -> Option<&str> {
        match self {
            DeviceLink::Device(id) => Some(id),
            DeviceLink::Detached => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    pub building_code: String,
    pub guid: Slot<String>,
    pub etag: Slot<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub code: Slot<String>,
    pub guid: Slot<String>,
    pub etag: Slot<String>,
    pub display_name: Option<String>,
    pub kind: EntityKind,
    pub is_existing: bool,
    pub cloud_device_id: Slot<String>,
    pub namespace: Namespace,
    pub general_type: String,
    pub type_name: String,
    pub device: DeviceLink,
}

impl Entity {
    pub fn is_reporting(&self) -> bool {
        !matches!(self.kind, EntityKind::Virtual { .. })
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self.kind, EntityKind::Virtual { .. })
    }
}

/// One telemetry point, attached to its owning entity and reported through a
/// reporting entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityField {
    pub entity_code: Slot<String>,
    pub entity_guid: Slot<String>,
    pub reporting_entity_code: Slot<String>,
    pub reporting_entity_guid: Slot<String>,
    /// Enumerated label, unique within the reporting entity.
    pub reporting_entity_field: String,
    pub standard_field_name: String,
    pub raw_field_name: Option<String>,
    pub raw_unit_path: Option<String>,
    pub standard_unit_value: Option<String>,
    pub raw_unit_value: Option<String>,
    pub missing: bool,
    pub units_mismatch: bool,

    /// Unit the device reported, kept for the incorrect-units report after
    /// `raw_unit_value` has been overwritten by the declared unit.
    pub discovered_unit: Option<String>,
    pub object_class: Option<ObjectClass>,
    pub device_id: String,
    pub control_program: String,
    /// Object reference as `<type>:<id>`, e.g. `AI:3`.
    pub object_ref: Option<String>,
    pub object_name: String,
}

impl EntityField {
    pub fn is_stateful(&self) -> bool {
        self.object_class.is_some_and(ObjectClass::is_stateful)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct State {
    pub reporting_entity_code: Slot<String>,
    pub reporting_entity_guid: Slot<String>,
    pub reporting_entity_field: String,
    pub standard_state: Option<String>,
    /// `active`/`inactive` for binary objects, a 1-based index for
    /// enumerated multi-state text.
    pub raw_state: String,
    pub raw_state_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub index: usize,
    pub message: String,
}
