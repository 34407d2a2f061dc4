//! Display grouping of devices
//!
//! Devices are grouped by everything except where they are and what they are
//! called: one group per `(make, qty)` pair, members in declaration order, groups
//! in order of first appearance. Within a group, charts are split by elevation
//! level.

use rustc_hash::{FxBuildHasher, FxHashMap};
use serde::{Deserialize, Serialize};

use crate::elevation::{level_lookup, level_of, ElevationLevel};
use crate::log_parse::DeviceRecord;
use crate::table::TimeSeriesTable;

/// `make` value the solver writes for devices without a property.
pub const NULL_MAKE: &str = "null";

/// A device with its elevation level, if levels were assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeveledDevice {
    /// Device as declared in the log
    #[serde(flatten)]
    pub device: DeviceRecord,
    /// Elevation level, `None` when clustering was skipped
    pub level: Option<usize>,
}

/// Devices sharing all non-positional attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceGroup {
    /// Shared device make
    pub make: String,
    /// Shared quantity label
    pub qty: String,
    /// Member device ids in declaration order
    pub ids: Vec<String>,
}

impl DeviceGroup {
    /// Heading for the group: the quantity, qualified by make when there is one.
    pub fn title(&self) -> String {
        if self.make == NULL_MAKE {
            self.qty.clone()
        } else {
            format!("{}: {}", self.qty, self.make)
        }
    }
}

/// Member ids of one group on one elevation level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelPartition {
    /// Elevation level, `None` for unleveled devices
    pub level: Option<usize>,
    /// Member ids in declaration order
    pub ids: Vec<String>,
}

/// One reading of one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceTrace {
    /// Output time (s)
    pub time: f64,
    /// Device id (DEVC column)
    pub id: String,
    /// Reading
    pub value: f64,
}

/// Attach levels to devices by exact elevation.
///
/// With `levels == None` every device is left unleveled.
pub fn attach_levels(devices: &[DeviceRecord], levels: Option<&[ElevationLevel]>) -> Vec<LeveledDevice> {
    let lookup = levels.map(level_lookup);
    devices
        .iter()
        .map(|device| LeveledDevice {
            level: lookup.as_ref().and_then(|l| level_of(l, device.z)),
            device: device.clone(),
        })
        .collect()
}

/// Group devices by `(make, qty)`.
pub fn group(devices: &[LeveledDevice]) -> Vec<DeviceGroup> {
    let mut index: FxHashMap<(&str, &str), usize> =
        FxHashMap::with_capacity_and_hasher(devices.len(), FxBuildHasher);
    let mut groups: Vec<DeviceGroup> = Vec::new();

    for LeveledDevice { device, .. } in devices {
        let key = (device.make.as_str(), device.qty.as_str());
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(DeviceGroup {
                make: device.make.clone(),
                qty: device.qty.clone(),
                ids: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].ids.push(device.id.clone());
    }
    groups
}

/// Split a group's members by level, levels in order of first appearance.
pub fn group_levels(group: &DeviceGroup, devices: &[LeveledDevice]) -> Vec<LevelPartition> {
    let mut partitions: Vec<LevelPartition> = Vec::new();
    for device in devices.iter().filter(|d| {
        d.device.make == group.make && d.device.qty == group.qty && group.ids.contains(&d.device.id)
    }) {
        match partitions.iter_mut().find(|p| p.level == device.level) {
            Some(partition) => partition.ids.push(device.device.id.clone()),
            None => partitions.push(LevelPartition {
                level: device.level,
                ids: vec![device.device.id.clone()],
            }),
        }
    }
    partitions
}

/// Long-form readings of the given devices, column by column in file order.
///
/// Ids without a DEVC column are skipped.
pub fn device_traces(devc: &TimeSeriesTable, ids: &[String]) -> Vec<DeviceTrace> {
    devc.iter_columns()
        .filter(|(name, _)| ids.iter().any(|id| id.as_str() == *name))
        .flat_map(|(name, values)| {
            devc.time()
                .iter()
                .zip(values)
                .map(move |(&time, &value)| DeviceTrace {
                    time,
                    id: name.to_string(),
                    value,
                })
        })
        .collect()
}
