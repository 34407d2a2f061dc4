//! Time-series tables read from the solver's CSV output
//!
//! FDS writes every CSV with two header rows: units first, then column names.
//! The `Time` column keys each row; every other column is a numeric channel
//! (HRR terms, control states, device readings).
//!
//! An empty table stands for "nothing uploaded yet" and is a normal value, not an
//! error. [`TimeSeriesTable::read_lenient`] folds unreadable uploads into that
//! state; [`TimeSeriesTable::from_reader`] reports them.

use std::io::Read;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{MonitorError, Result};

/// Name of the key column in every FDS CSV.
pub const TIME_COLUMN: &str = "Time";

/// Column-major numeric table keyed by `Time`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesTable {
    time: Vec<f64>,
    columns: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl TimeSeriesTable {
    /// The empty table (no upload).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a table from a time column and named value columns.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::MalformedTabularInput`] if a column length differs
    /// from the time column.
    pub fn from_columns(
        time: Vec<f64>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self> {
        let (names, values): (Vec<String>, Vec<Vec<f64>>) = columns.into_iter().unzip();
        if let Some(bad) = names
            .iter()
            .zip(&values)
            .find(|(_, v)| v.len() != time.len())
        {
            return Err(MonitorError::MalformedTabularInput {
                source_name: "in-memory".to_string(),
                reason: format!(
                    "column '{}' has {} rows, expected {}",
                    bad.0,
                    bad.1.len(),
                    time.len()
                ),
            });
        }
        Ok(Self {
            time,
            columns: names,
            values,
        })
    }

    /// Read an FDS CSV (units row, names row, data rows).
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::MalformedTabularInput`] when the header rows are
    /// missing, there is no `Time` column, or a cell is not numeric.
    pub fn from_reader<R: Read>(source_name: &str, reader: R) -> Result<Self> {
        let malformed = |reason: String| MonitorError::MalformedTabularInput {
            source_name: source_name.to_string(),
            reason,
        };

        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = csv_reader.records();

        // Units row
        records
            .next()
            .ok_or_else(|| malformed("missing units row".to_string()))?
            .map_err(|e| malformed(e.to_string()))?;
        let header = records
            .next()
            .ok_or_else(|| malformed("missing column name row".to_string()))?
            .map_err(|e| malformed(e.to_string()))?;

        let time_index = header
            .iter()
            .position(|name| name == TIME_COLUMN)
            .ok_or_else(|| malformed(format!("no '{TIME_COLUMN}' column")))?;
        let columns: Vec<String> = header
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != time_index)
            .map(|(_, name)| name.to_string())
            .collect();

        let mut time = Vec::new();
        let mut values = vec![Vec::new(); columns.len()];
        for (row, record) in records.enumerate() {
            let record = record.map_err(|e| malformed(e.to_string()))?;
            let mut value_col = 0;
            for (i, cell) in record.iter().enumerate() {
                let value: f64 = cell.parse().map_err(|_| {
                    malformed(format!("row {}: '{cell}' is not a number", row + 1))
                })?;
                if i == time_index {
                    time.push(value);
                } else {
                    values[value_col].push(value);
                    value_col += 1;
                }
            }
        }

        debug!(
            source = source_name,
            rows = time.len(),
            columns = columns.len(),
            "read time-series table"
        );
        Ok(Self {
            time,
            columns,
            values,
        })
    }

    /// Read an FDS CSV, falling back to the empty table when it is unreadable.
    pub fn read_lenient<R: Read>(source_name: &str, reader: R) -> Self {
        Self::from_reader(source_name, reader).unwrap_or_else(|e| {
            warn!("{e}; treating {source_name} upload as empty");
            Self::empty()
        })
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// The `Time` column.
    pub fn time(&self) -> &[f64] {
        &self.time
    }

    /// Names of the value columns, in file order.
    pub fn value_columns(&self) -> &[String] {
        &self.columns
    }

    /// Values of the named column.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(&self.values[index])
    }

    /// Iterate `(name, values)` pairs in file order.
    pub fn iter_columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(Vec::as_slice))
    }

    /// `(min, max)` of the `Time` column, `None` for an empty table.
    pub fn time_bounds(&self) -> Option<(f64, f64)> {
        if self.time.is_empty() {
            return None;
        }
        let min = self.time.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.time.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some((min, max))
    }
}
