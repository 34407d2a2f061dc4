//! FDS Run Monitor Core Library
//!
//! Turns the output of a running (or finished) Fire Dynamics Simulator job into
//! the data a progress dashboard needs: the HRR, CTRL and DEVC CSVs plus the
//! free-text `CHID.out` log.
//!
//! ## Pipeline
//!
//! - **Log extraction**: start/end times, timestep records and device declarations
//!   located by literal anchors in the solver log
//! - **Progress reconciliation**: one `(start, current, end)` triple from the
//!   tables and the log
//! - **Elevation levels**: k-means over device heights with a silhouette-chosen
//!   default level count
//! - **Device groups**: devices grouped by make and quantity for charting
//!
//! Missing uploads are a normal state and produce empty results; see
//! [`pipeline`] for the full pass and [`MonitorError`] for the few real failures.

pub mod activation;
pub mod config;
pub mod elevation;
pub mod error;
pub mod grouping;
pub mod log_parse;
pub mod pipeline;
pub mod progress;
pub mod table;

pub use activation::{activation_events, ActivationEvent};
pub use config::MonitorConfig;
pub use elevation::{assign_levels, select_k, ElevationLevel, KMeansConfig};
pub use error::{MonitorError, Result};
pub use grouping::{
    attach_levels, device_traces, group, group_levels, DeviceGroup, DeviceTrace, LevelPartition,
    LeveledDevice,
};
pub use log_parse::{
    parse_device_metadata, parse_time_bounds, parse_timesteps, DeviceRecord, TimestepRecord,
};
pub use pipeline::{build_snapshot, ElevationChoice, Monitor, MonitorInputs, RunSnapshot};
pub use progress::{reconcile, ProgressTriple};
pub use table::TimeSeriesTable;
