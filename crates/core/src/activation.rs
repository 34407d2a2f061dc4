//! Control-device activation timeline
//!
//! Control channels in `CHID_ctrl.csv` hold a binary state per output time.
//! An activation is any row-to-row increase; the timeline lists them in time
//! order with a running sequence number for display.

use serde::{Deserialize, Serialize};

use crate::table::TimeSeriesTable;

/// One control activation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationEvent {
    /// Output time at which the new state was first recorded (s)
    pub time: f64,
    /// Control channel name
    pub ctrl: String,
    /// Size of the state change
    pub value: f64,
    /// 1-based position in the timeline
    pub sequence: usize,
}

/// Collect activations from a CTRL table, ordered by time.
///
/// Simultaneous activations keep the column order of the file.
pub fn activation_events(ctrl: &TimeSeriesTable) -> Vec<ActivationEvent> {
    let time = ctrl.time();
    let mut events: Vec<ActivationEvent> = ctrl
        .iter_columns()
        .flat_map(|(name, states)| {
            states
                .windows(2)
                .enumerate()
                .filter_map(move |(row, pair)| {
                    let change = pair[1] - pair[0];
                    (change > 0.0).then(|| ActivationEvent {
                        time: time[row + 1],
                        ctrl: name.to_string(),
                        value: change,
                        sequence: 0,
                    })
                })
        })
        .collect();

    events.sort_by(|a, b| a.time.total_cmp(&b.time));
    for (i, event) in events.iter_mut().enumerate() {
        event.sequence = i + 1;
    }
    events
}
