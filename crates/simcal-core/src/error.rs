//! Error types for calibration and accuracy operations

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for calibration operations
pub type Result<T> = std::result::Result<T, CalibError>;

/// Errors that can occur during calibration and comparison
#[derive(Debug, Error)]
pub enum CalibError {
    /// Native benchmark binary missing or its build failed
    #[error("Benchmark binary missing: {path}")]
    BuildOrBinaryMissing {
        /// Path that was checked
        path: PathBuf,
    },

    /// Calibration collected fewer than the minimum usable data points
    #[error("Insufficient data points for '{benchmark}': need >=3, got {got}")]
    InsufficientDataPoints {
        /// Benchmark being calibrated
        benchmark: String,
        /// Number of points actually collected
        got: usize,
    },

    /// Collaborator output did not contain a usable value
    #[error("Parse failure for '{identifier}': {reason}")]
    ParseFailure {
        /// Test identifier whose output was being scanned
        identifier: String,
        /// Reason for failure
        reason: String,
    },

    /// Collaborator invocation exceeded its timeout
    #[error("Timeout after {timeout_secs}s running '{identifier}'")]
    Timeout {
        /// Test identifier being run
        identifier: String,
        /// Timeout that was enforced, in seconds
        timeout_secs: u64,
    },

    /// Collaborator process could not be spawned or crashed
    #[error("Process failure for '{identifier}': {reason}")]
    ProcessFailure {
        /// Test identifier being run
        identifier: String,
        /// Reason for failure
        reason: String,
    },

    /// No suite produced a CPI for a benchmark
    #[error("No simulator CPI available for '{benchmark}'")]
    NoSimulatorCpi {
        /// Benchmark omitted from comparison
        benchmark: String,
    },

    /// A required static configuration table is missing or ill-formed
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// What failed validation
        reason: String,
    },

    /// No benchmark produced any usable result at all
    #[error("No usable benchmarks: {reason}")]
    NoUsableBenchmarks {
        /// Why the whole run is empty
        reason: String,
    },

    /// I/O error reading configuration or result files
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// Malformed JSON in a configuration or result file
    #[error("JSON error: {source}")]
    Json {
        /// Underlying serde error
        #[from]
        source: serde_json::Error,
    },
}

impl CalibError {
    /// Create a missing-binary error
    pub fn binary_missing(path: impl Into<PathBuf>) -> Self {
        Self::BuildOrBinaryMissing { path: path.into() }
    }

    /// Create a parse failure error
    pub fn parse_failure(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ParseFailure {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }

    /// Create a process failure error
    pub fn process_failure(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ProcessFailure {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}
