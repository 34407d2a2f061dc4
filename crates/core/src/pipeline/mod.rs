//! Full pass from raw uploads to everything a dashboard renders
//!
//! Each interaction recomputes the whole chain:
//!
//! ```text
//! CSV text ──► tables ──┐
//!                       ├──► reconcile ──► progress
//! .out text ──► log ────┤
//!                       ├──► timesteps
//!                       └──► devices ──► levels ──► groups
//! ```
//!
//! Missing uploads are empty, not errors; the snapshot carries a notice for each
//! section that has nothing to show. The only failures are a log without start/end
//! records and a level override that the device elevations cannot satisfy.

mod cache;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::activation::{activation_events, ActivationEvent};
use crate::config::MonitorConfig;
use crate::elevation::{assign_levels, select_k, unique_elevations};
use crate::error::{MonitorError, Result};
use crate::grouping::{attach_levels, group, DeviceGroup, LeveledDevice};
use crate::log_parse::{parse_device_metadata, parse_timesteps, DeviceRecord, TimestepRecord};
use crate::progress::{reconcile, ProgressTriple};
use crate::table::TimeSeriesTable;

pub use cache::{content_key, SnapshotCache};

/// Raw uploads; `None` means not uploaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MonitorInputs {
    /// `CHID_hrr.csv`
    pub hrr: Option<String>,
    /// `CHID_ctrl.csv`
    pub ctrl: Option<String>,
    /// `CHID_devc.csv`
    pub devc: Option<String>,
    /// `CHID.out`
    pub log: Option<String>,
}

/// How the elevation level count was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElevationChoice {
    /// Silhouette-selected default, `None` when too few elevations to search
    pub default_k: Option<usize>,
    /// Count actually used (override or default)
    pub k: usize,
    /// Distinct device elevations; the largest count a user may pick
    pub max_k: usize,
}

/// Everything the rendering layer needs for one pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    /// Reconciled start/current/end
    pub progress: ProgressTriple,
    /// Timesteps from the log
    pub timesteps: Vec<TimestepRecord>,
    /// Devices from the log with their levels
    pub devices: Vec<LeveledDevice>,
    /// Level count decision, `None` when devices were not clustered
    pub elevation: Option<ElevationChoice>,
    /// Display groups
    pub groups: Vec<DeviceGroup>,
    /// CTRL activation timeline
    pub activations: Vec<ActivationEvent>,
    /// HRR series
    pub hrr: TimeSeriesTable,
    /// Control states
    pub ctrl: TimeSeriesTable,
    /// DEVC readings
    pub devc: TimeSeriesTable,
}

impl RunSnapshot {
    /// Placeholder messages for sections with no data.
    pub fn notices(&self) -> Vec<&'static str> {
        let mut notices = Vec::new();
        if self.timesteps.is_empty() {
            notices.push("Upload CHID.out to see more information");
        }
        if self.hrr.is_empty() {
            notices.push("Upload CHID_hrr.csv to see HRR Graph");
        }
        if self.ctrl.is_empty() {
            notices.push("Upload CHID_ctrl.csv to see CTRL Timeline");
        }
        if self.devc.is_empty() {
            notices.push("Upload CHID_devc.csv to see DEVC Timelines");
        }
        notices
    }
}

/// Run the pipeline once, without caching.
///
/// # Errors
///
/// - [`MonitorError::MissingAnchor`] if a log is given without start/end records
/// - [`MonitorError::InvalidClusterCount`] if the level override exceeds the
///   number of distinct device elevations
pub fn build_snapshot(inputs: &MonitorInputs, config: &MonitorConfig) -> Result<RunSnapshot> {
    let read = |name: &str, payload: Option<&str>| {
        payload.map_or_else(TimeSeriesTable::empty, |text| {
            TimeSeriesTable::read_lenient(name, text.as_bytes())
        })
    };
    let hrr = read("hrr", inputs.hrr.as_deref());
    let ctrl = read("ctrl", inputs.ctrl.as_deref());
    let devc = read("devc", inputs.devc.as_deref());
    let log = inputs.log.as_deref().unwrap_or_default();

    let progress = reconcile(&[&hrr, &devc, &ctrl], Some(log))?;
    let timesteps = parse_timesteps(log);
    let (devices, elevation) = level_devices(&parse_device_metadata(log), config)?;
    let groups = group(&devices);
    let activations = activation_events(&ctrl);

    debug!(
        timesteps = timesteps.len(),
        devices = devices.len(),
        groups = groups.len(),
        activations = activations.len(),
        "built run snapshot"
    );
    Ok(RunSnapshot {
        progress,
        timesteps,
        devices,
        elevation,
        groups,
        activations,
        hrr,
        ctrl,
        devc,
    })
}

/// Cluster device elevations into levels if there is anything to cluster.
///
/// Devices stay unleveled when there are none, when they share one elevation,
/// when too few elevations exist for a default and no override is given, or
/// when the chosen count is 1.
///
/// # Errors
///
/// Returns [`MonitorError::InvalidClusterCount`] for an override outside
/// `1..=distinct elevations`.
pub fn level_devices(
    devices: &[DeviceRecord],
    config: &MonitorConfig,
) -> Result<(Vec<LeveledDevice>, Option<ElevationChoice>)> {
    let z: Vec<f64> = devices.iter().map(|d| d.z).collect();
    let max_k = unique_elevations(&z).len();
    if max_k <= 1 {
        return Ok((attach_levels(devices, None), None));
    }

    let default_k = match select_k(&z, &config.kmeans) {
        Ok(k) => Some(k),
        Err(MonitorError::InsufficientData { unique, required }) => {
            warn!(unique, required, "too few elevations to pick a level count");
            None
        }
        Err(e) => return Err(e),
    };

    let Some(k) = config.elevation_groups.or(default_k) else {
        return Ok((attach_levels(devices, None), None));
    };
    if k == 0 || k > max_k {
        return Err(MonitorError::InvalidClusterCount { k, unique: max_k });
    }
    info!(k, ?default_k, max_k, "grouping devices by elevation");

    let choice = ElevationChoice {
        default_k,
        k,
        max_k,
    };
    if k == 1 {
        return Ok((attach_levels(devices, None), Some(choice)));
    }
    let levels = assign_levels(&z, k, &config.kmeans)?;
    Ok((attach_levels(devices, Some(levels.as_slice())), Some(choice)))
}

/// Pipeline front end with a content-keyed snapshot cache.
pub struct Monitor {
    cache: SnapshotCache,
}

impl Monitor {
    /// Monitor caching up to `cache_capacity` snapshots.
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            cache: SnapshotCache::new(cache_capacity),
        }
    }

    /// Monitor sized from `config`.
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.cache_capacity)
    }

    /// Snapshot for `inputs`, reusing a stored one for identical content.
    ///
    /// # Errors
    ///
    /// See [`build_snapshot`]. Failures are not cached.
    pub fn run(&mut self, inputs: &MonitorInputs, config: &MonitorConfig) -> Result<Arc<RunSnapshot>> {
        if let Some(hit) = self.cache.get(inputs, config) {
            debug!("snapshot cache hit");
            return Ok(hit);
        }
        let snapshot = Arc::new(build_snapshot(inputs, config)?);
        self.cache
            .insert(inputs.clone(), config.clone(), Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Snapshots currently cached.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str, z: f64) -> DeviceRecord {
        DeviceRecord {
            x: 1.0,
            y: 1.0,
            z,
            make: "null".into(),
            id: id.into(),
            qty: "TEMPERATURE".into(),
        }
    }

    #[test]
    fn test_no_uploads() {
        let snapshot = build_snapshot(&MonitorInputs::default(), &MonitorConfig::default()).unwrap();
        assert_eq!(snapshot.progress, ProgressTriple::default());
        assert!(snapshot.devices.is_empty());
        assert!(snapshot.groups.is_empty());
        assert_eq!(snapshot.notices().len(), 4);
    }

    #[test]
    fn test_single_elevation_is_not_clustered() {
        let devices = [device("A", 1.0), device("B", 1.0)];
        let (leveled, choice) = level_devices(&devices, &MonitorConfig::default()).unwrap();
        assert!(choice.is_none());
        assert!(leveled.iter().all(|d| d.level.is_none()));
    }

    #[test]
    fn test_two_elevations_skip_default_but_honour_override() {
        let devices = [device("A", 0.0), device("B", 3.0)];
        let (leveled, choice) = level_devices(&devices, &MonitorConfig::default()).unwrap();
        assert!(choice.is_none());
        assert!(leveled.iter().all(|d| d.level.is_none()));

        let config = MonitorConfig::default().with_elevation_groups(2);
        let (leveled, choice) = level_devices(&devices, &config).unwrap();
        assert_eq!(
            choice,
            Some(ElevationChoice {
                default_k: None,
                k: 2,
                max_k: 2
            })
        );
        assert_eq!(leveled[0].level, Some(0));
        assert_eq!(leveled[1].level, Some(1));
    }

    #[test]
    fn test_override_of_one_leaves_devices_unleveled() {
        let devices = [device("A", 0.0), device("B", 3.0), device("C", 6.0)];
        let config = MonitorConfig::default().with_elevation_groups(1);
        let (leveled, choice) = level_devices(&devices, &config).unwrap();
        assert_eq!(choice.map(|c| c.k), Some(1));
        assert!(leveled.iter().all(|d| d.level.is_none()));
    }

    #[test]
    fn test_huge_elevation_does_not_panic() {
        let log = "\
 Simulation Start Time (s)   0.0
 Simulation End Time (s)    10.0
 Coords:  0.00  0.00  0.00, Make: null, ID: LOW, Quantity: TEMPERATURE
 Coords:  0.00  0.00  5.00, Make: null, ID: MID, Quantity: TEMPERATURE
 Coords:  0.00  0.00  1.0E+200, Make: null, ID: FAR, Quantity: TEMPERATURE
";
        let inputs = MonitorInputs {
            log: Some(log.to_string()),
            ..Default::default()
        };
        let snapshot = build_snapshot(&inputs, &MonitorConfig::default()).unwrap();
        assert_eq!(snapshot.devices.len(), 3);
        let choice = snapshot.elevation.unwrap();
        assert_eq!(choice.default_k, Some(2));
        assert_eq!(snapshot.devices[0].level, snapshot.devices[1].level);
        assert_eq!(snapshot.devices[2].level, Some(1));
    }

    #[test]
    fn test_negative_zero_counts_as_ground_level() {
        let devices = [device("A", -0.0), device("B", 0.0), device("C", 3.0)];
        let (leveled, choice) = level_devices(&devices, &MonitorConfig::default()).unwrap();
        assert!(choice.is_none());
        assert!(leveled.iter().all(|d| d.level.is_none()));

        let config = MonitorConfig::default().with_elevation_groups(2);
        let (leveled, choice) = level_devices(&devices, &config).unwrap();
        assert_eq!(choice.map(|c| c.max_k), Some(2));
        let levels: Vec<Option<usize>> = leveled.iter().map(|d| d.level).collect();
        assert_eq!(levels, vec![Some(0), Some(0), Some(1)]);
    }

    #[test]
    fn test_override_out_of_range() {
        let devices = [device("A", 0.0), device("B", 3.0), device("C", 6.0)];
        for k in [0, 4] {
            let config = MonitorConfig::default().with_elevation_groups(k);
            assert!(matches!(
                level_devices(&devices, &config),
                Err(MonitorError::InvalidClusterCount { unique: 3, .. })
            ));
        }
    }
}
