//! Structured record extraction from the solver's `.out` log
//!
//! The log is not a fixed grammar: the solver interleaves banners, tables and
//! diagnostics, and the line order varies between versions. Each record type is
//! therefore located by its own literal anchor and everything between matches is
//! ignored.
//!
//! Three record sets are extracted independently:
//! - the declared start/end times (first occurrence, required when a log exists)
//! - per-timestep step sizes and cumulative times (every occurrence, in order)
//! - device declarations with coordinates (every occurrence, in order)

pub mod pattern;

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{MonitorError, Result};
use pattern::AnchorPattern;

/// Literal anchor of the declared simulation start time.
pub const START_TIME_ANCHOR: &str = "Simulation Start Time (s)";

/// Literal anchor of the declared simulation end time.
pub const END_TIME_ANCHOR: &str = "Simulation End Time (s)";

static START_TIME: LazyLock<AnchorPattern> =
    LazyLock::new(|| compile_static("Simulation Start Time (s) {:>f}"));

static END_TIME: LazyLock<AnchorPattern> =
    LazyLock::new(|| compile_static("Simulation End Time (s) {:>f}"));

static TIMESTEP: LazyLock<AnchorPattern> =
    LazyLock::new(|| compile_static("Step Size: {size:>e} s, Total Time: {time:>f} s"));

static DEVICE: LazyLock<AnchorPattern> = LazyLock::new(|| {
    compile_static(
        "Coords: {x:>f} {y:>f} {z:>f}, Make: {make}, ID: {id}, Quantity: {qty}\n",
    )
});

fn compile_static(template: &str) -> AnchorPattern {
    let pattern = AnchorPattern::compile(template).expect("built-in anchor template must compile");
    debug!(template = pattern.template(), "compiled anchor template");
    pattern
}

/// One solver timestep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimestepRecord {
    /// Step size in seconds
    pub size: f64,
    /// Cumulative simulated time in seconds
    pub time: f64,
}

/// One device declared in the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// X coordinate (m)
    pub x: f64,
    /// Y coordinate (m)
    pub y: f64,
    /// Z coordinate / elevation (m)
    pub z: f64,
    /// Device make, `null` when the device has no property
    pub make: String,
    /// Unique device identifier; matches the DEVC CSV column header
    pub id: String,
    /// Measured quantity label
    pub qty: String,
}

/// Declared `(start, end)` times of the run.
///
/// # Errors
///
/// Returns [`MonitorError::MissingAnchor`] if either anchor is absent. A value that
/// is present but zero is returned as `0.0`.
pub fn parse_time_bounds(text: &str) -> Result<(f64, f64)> {
    let start = scalar(&START_TIME, START_TIME_ANCHOR, text)?;
    let end = scalar(&END_TIME, END_TIME_ANCHOR, text)?;
    debug!(start, end, "parsed declared time bounds");
    Ok((start, end))
}

fn scalar(pattern: &AnchorPattern, anchor: &'static str, text: &str) -> Result<f64> {
    pattern
        .search(text)
        .and_then(|m| m.float_at(0))
        .ok_or(MonitorError::MissingAnchor { anchor })
}

/// Every timestep record in document order. Empty when the log has none.
pub fn parse_timesteps(text: &str) -> Vec<TimestepRecord> {
    let steps: Vec<TimestepRecord> = TIMESTEP
        .find_all(text)
        .filter_map(|m| {
            Some(TimestepRecord {
                size: m.float("size")?,
                time: m.float("time")?,
            })
        })
        .collect();
    debug!(count = steps.len(), "parsed timestep records");
    steps
}

/// Every device declaration in document order. Empty when the log has none.
pub fn parse_device_metadata(text: &str) -> Vec<DeviceRecord> {
    let devices: Vec<DeviceRecord> = DEVICE
        .find_all(text)
        .filter_map(|m| {
            Some(DeviceRecord {
                x: m.float("x")?,
                y: m.float("y")?,
                z: m.float("z")?,
                make: m.text("make")?.to_string(),
                id: m.text("id")?.to_string(),
                qty: m.text("qty")?.to_string(),
            })
        })
        .collect();
    debug!(count = devices.len(), "parsed device declarations");
    devices
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const HEADER: &str = "\
 Fire Dynamics Simulator

 Job TITLE        : corridor
 Job ID string    : corridor

 Simulation Start Time (s)              0.0
 Simulation End Time (s)              600.0
";

    #[test]
    fn test_time_bounds() {
        let (start, end) = parse_time_bounds(HEADER).unwrap();
        assert_eq!(start, 0.0);
        assert_eq!(end, 600.0);
        assert!(start <= end);
    }

    #[test]
    fn test_time_bounds_missing_anchor() {
        let no_end = HEADER.replace("Simulation End Time (s)", "Simulation Stop");
        match parse_time_bounds(&no_end) {
            Err(MonitorError::MissingAnchor { anchor }) => assert_eq!(anchor, END_TIME_ANCHOR),
            other => panic!("expected missing end anchor, got {other:?}"),
        }

        let no_start = HEADER.replace("Simulation Start Time (s)", "");
        assert!(matches!(
            parse_time_bounds(&no_start),
            Err(MonitorError::MissingAnchor {
                anchor: START_TIME_ANCHOR
            })
        ));
    }

    #[test]
    fn test_timesteps_in_document_order() {
        let log = "\
 Time Step:      1,    Simulation Time:      0.08 s
 Step Size:    0.786E-01 s, Total Time:       0.08 s
 Pressure Iterations: 1
 Time Step:      2,    Simulation Time:      0.16 s
 Step Size:    0.786E-01 s, Total Time:       0.16 s
";
        let steps = parse_timesteps(log);
        assert_eq!(steps.len(), 2);
        assert_relative_eq!(steps[0].size, 0.0786);
        assert_relative_eq!(steps[0].time, 0.08);
        assert_relative_eq!(steps[1].time, 0.16);
    }

    #[test]
    fn test_timestep_roundtrip() {
        let records: Vec<TimestepRecord> = (1..=25)
            .map(|i| TimestepRecord {
                size: 0.0125 * f64::from(i % 4 + 1),
                time: 0.35 * f64::from(i),
            })
            .collect();
        let log: String = records
            .iter()
            .map(|r| format!(" Step Size: {:>12.4E} s, Total Time: {:>10.3} s\n", r.size, r.time))
            .collect();

        let parsed = parse_timesteps(&log);
        assert_eq!(parsed.len(), records.len());
        for (got, want) in parsed.iter().zip(&records) {
            assert_relative_eq!(got.size, want.size, max_relative = 1e-4);
            assert_relative_eq!(got.time, want.time, max_relative = 1e-4);
        }
    }

    #[test]
    fn test_no_timesteps_is_empty() {
        assert!(parse_timesteps(HEADER).is_empty());
        assert!(parse_timesteps("").is_empty());
    }

    #[test]
    fn test_device_metadata() {
        let log = "\
 Device Coordinates
    1 Coords:     1.50    2.50    0.30, Make: null, ID: TC_0, Quantity: TEMPERATURE
    2 Coords:     1.50    2.50    3.10, Make: SPRK, ID: SP-1, Quantity: LINK TEMPERATURE
";
        let devices = parse_device_metadata(log);
        assert_eq!(devices.len(), 2);
        assert_eq!(
            devices[0],
            DeviceRecord {
                x: 1.5,
                y: 2.5,
                z: 0.3,
                make: "null".into(),
                id: "TC_0".into(),
                qty: "TEMPERATURE".into(),
            }
        );
        assert_eq!(devices[1].id, "SP-1");
        assert_eq!(devices[1].qty, "LINK TEMPERATURE");
        assert_eq!(devices[1].z, 3.1);
    }

    #[test]
    fn test_device_line_requires_newline() {
        let log = "Coords: 0.0 0.0 1.0, Make: null, ID: D1, Quantity: VELOCITY";
        assert!(parse_device_metadata(log).is_empty());
    }
}
