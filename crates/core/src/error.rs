//! Error types for the monitor pipeline.
//!
//! Only two failures ever reach a caller of the full pipeline: a log that was
//! uploaded but lacks the start/end anchors, and an elevation override that
//! cannot be honoured. Everything else (missing uploads, unreadable tables,
//! too few elevations to cluster) degrades to an empty or unleveled result.

use thiserror::Error;

use crate::log_parse::pattern::PatternError;

/// Errors produced while extracting, reconciling or clustering run data.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The log text is present but a required scalar anchor is absent.
    #[error("log text has no '{anchor}' record")]
    MissingAnchor {
        /// Literal anchor that could not be found
        anchor: &'static str,
    },

    /// Too few distinct elevations for a meaningful clustering pass.
    #[error("elevation clustering needs at least {required} distinct elevations, found {unique}")]
    InsufficientData {
        /// Distinct z values available
        unique: usize,
        /// Minimum distinct z values required
        required: usize,
    },

    /// Requested level count cannot be fitted to the available elevations.
    #[error("cannot split {unique} distinct elevations into {k} levels")]
    InvalidClusterCount {
        /// Requested number of levels
        k: usize,
        /// Distinct z values available
        unique: usize,
    },

    /// An uploaded table could not be read as FDS CSV output.
    #[error("malformed {source_name} table: {reason}")]
    MalformedTabularInput {
        /// Which upload the table came from (`hrr`, `ctrl`, `devc`)
        source_name: String,
        /// Reader diagnostic
        reason: String,
    },

    /// An anchor template failed to compile.
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, MonitorError>;
