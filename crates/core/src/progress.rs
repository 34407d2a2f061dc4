//! Simulation progress from four partially overlapping time sources
//!
//! The HRR, DEVC and CTRL tables each cover whatever part of the run has been
//! written so far; the log declares the intended start and end and lists every
//! completed timestep. None of them is complete on its own, so progress is
//! assembled from all of them:
//!
//! 1. Tables widen `start` downwards and set `current` from their latest row.
//! 2. A log, when present, is authoritative for `start` and `end` and can push
//!    `current` forward to its last reported timestep.
//! 3. `end` is never allowed to trail `current` (truncated or still-running logs).

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::log_parse::{parse_time_bounds, parse_timesteps};
use crate::table::TimeSeriesTable;

/// Reconciled `(start, current, end)` simulation times in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressTriple {
    /// Declared or earliest observed start time
    pub start: f64,
    /// Latest observed simulation time
    pub current: f64,
    /// Declared end time, or `current` if that is later
    pub end: f64,
}

impl ProgressTriple {
    /// True when `start <= current <= end`.
    ///
    /// A violation means the uploads disagree with each other; it is reported,
    /// not rejected.
    pub fn is_ordered(&self) -> bool {
        self.start <= self.current && self.current <= self.end
    }

    /// Completed fraction of the run in `[0, 1]`.
    ///
    /// `None` when `end == start`; there is nothing to show a bar for.
    pub fn fraction(&self) -> Option<f64> {
        let span = self.end - self.start;
        if span == 0.0 || !span.is_finite() {
            return None;
        }
        Some(((self.current - self.start) / span).clamp(0.0, 1.0))
    }

    /// Human-readable progress line, e.g. `"25.0% Complete 150 s / 600 s"`.
    pub fn summary(&self) -> Option<String> {
        self.fraction().map(|f| {
            format!(
                "{:.1}% Complete {} s / {} s",
                f * 100.0,
                self.current,
                self.end
            )
        })
    }
}

/// Merge table time ranges and the log into one progress triple.
///
/// `tables` are visited in the order given; empty tables are skipped. Note that
/// each table sets `current` from `max(end, table max)` where `end` is still the
/// initial zero during this pass, so the last non-empty table wins rather than
/// the latest one. Dashboards built on these numbers rely on that behaviour.
///
/// # Errors
///
/// Returns [`MonitorError::MissingAnchor`](crate::MonitorError::MissingAnchor)
/// when `log` is non-empty but lacks the start/end records.
pub fn reconcile(tables: &[&TimeSeriesTable], log: Option<&str>) -> Result<ProgressTriple> {
    let mut start: f64 = 0.0;
    let mut current: f64 = 0.0;
    let mut end: f64 = 0.0;

    for (min, max) in tables.iter().filter_map(|t| t.time_bounds()) {
        start = start.min(min);
        current = end.max(max);
    }

    if let Some(text) = log.filter(|t| !t.is_empty()) {
        (start, end) = parse_time_bounds(text)?;
        let latest_step = parse_timesteps(text)
            .iter()
            .map(|s| s.time)
            .fold(f64::NEG_INFINITY, f64::max);
        current = current.max(latest_step);
    }

    end = end.max(current);

    let progress = ProgressTriple {
        start,
        current,
        end,
    };
    if progress.is_ordered() {
        debug!(start, current, end, "reconciled simulation progress");
    } else {
        warn!(start, current, end, "time sources disagree: start is after current");
    }
    Ok(progress)
}
