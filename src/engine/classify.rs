//! Partition device/asset pairs into reporting and virtual entities.
//!
//! ```text
//! (device, asset) pairs
//!   ├─ asset linked to >1 device   ─┐
//!   ├─ device linked to >1 asset   ─┴─▶ affected rows
//!   │                                    ├─ one Virtual entity per asset
//!   │                                    └─ one Passthrough entity per device
//!   └─ everything else (1:1)        ───▶ one Direct entity per device
//! ```
//!
//! Both partitions are closed: a device's rows are either all affected or none
//! of them are, and the same holds for an asset's rows.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::intake::Point;
use crate::{DeviceLink, Entity, EntityKind, GuidStrategy, Namespace, Slot};

pub(crate) const PASSTHROUGH: &str = "PASSTHROUGH";

#[derive(Debug, Default)]
pub(crate) struct Classification {
    /// Passthrough, then direct, then virtual entities, each sorted.
    pub entities: Vec<Entity>,
    /// Device id to its reporting entity.
    pub by_device: BTreeMap<String, usize>,
    /// Asset path to its virtual entity.
    pub by_asset: BTreeMap<String, usize>,
}

pub(crate) fn classify(points: &[Point], guids: &GuidStrategy) -> Classification {
    let mut assets_per_device: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut devices_per_asset: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for point in points {
        assets_per_device.entry(&point.device_id).or_default().insert(&point.asset_path);
        devices_per_asset.entry(&point.asset_path).or_default().insert(&point.device_id);
    }

    let shared_devices: BTreeSet<&str> =
        assets_per_device.iter().filter(|(_, assets)| assets.len() > 1).map(|(d, _)| *d).collect();
    let shared_assets: BTreeSet<&str> =
        devices_per_asset.iter().filter(|(_, devices)| devices.len() > 1).map(|(a, _)| *a).collect();

    let mut passthrough_devices: BTreeSet<&str> = BTreeSet::new();
    let mut virtual_assets: BTreeMap<&str, &Point> = BTreeMap::new();
    let mut direct_devices: BTreeMap<&str, &Point> = BTreeMap::new();
    for point in points {
        let affected = shared_devices.contains(point.device_id.as_str())
            || shared_assets.contains(point.asset_path.as_str());
        if affected {
            passthrough_devices.insert(&point.device_id);
            virtual_assets.entry(&point.asset_path).or_insert(point);
        } else {
            direct_devices.entry(&point.device_id).or_insert(point);
        }
    }

    let mut out = Classification::default();

    for device in passthrough_devices {
        debug!(device, "passthrough reporting entity");
        out.by_device.insert(device.to_string(), out.entities.len());
        out.entities.push(Entity {
            code: Slot::Present(device.to_string()),
            guid: Slot::MissingInSource,
            etag: Slot::MissingInSource,
            display_name: None,
            kind: EntityKind::Passthrough,
            is_existing: false,
            cloud_device_id: Slot::MissingInSource,
            namespace: Namespace::Gateways,
            general_type: PASSTHROUGH.to_string(),
            type_name: PASSTHROUGH.to_string(),
            device: DeviceLink::Device(device.to_string()),
        });
    }

    for (device, point) in direct_devices {
        debug!(device, asset = %point.asset_path, "direct reporting entity");
        out.by_device.insert(device.to_string(), out.entities.len());
        out.entities.push(Entity {
            code: Slot::Present(device.to_string()),
            guid: Slot::MissingInSource,
            etag: Slot::MissingInSource,
            display_name: Some(point.asset_name.clone()),
            kind: EntityKind::Direct { asset_path: point.asset_path.clone() },
            is_existing: false,
            cloud_device_id: Slot::MissingInSource,
            namespace: Namespace::Hvac,
            general_type: general_type_of(&point.type_name),
            type_name: point.type_name.clone(),
            device: DeviceLink::Device(device.to_string()),
        });
    }

    for (asset, point) in virtual_assets {
        let guid = guids.mint(&point.building, asset);
        debug!(asset, %guid, "virtual entity");
        out.by_asset.insert(asset.to_string(), out.entities.len());
        out.entities.push(Entity {
            code: Slot::Present(asset.to_string()),
            guid: Slot::Present(guid),
            etag: Slot::MissingInSource,
            display_name: Some(point.asset_name.clone()),
            kind: EntityKind::Virtual { asset_path: asset.to_string() },
            is_existing: false,
            cloud_device_id: Slot::MissingInSource,
            namespace: Namespace::Hvac,
            general_type: general_type_of(&point.type_name),
            type_name: point.type_name.clone(),
            device: DeviceLink::Detached,
        });
    }

    out
}

/// `AHU_SFSS_DSP` is an `AHU`.
fn general_type_of(type_name: &str) -> String {
    type_name.split('_').next().unwrap_or(type_name).to_string()
}
