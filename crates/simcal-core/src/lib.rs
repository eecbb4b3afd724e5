//! Hardware latency calibration and simulator accuracy comparison.
//!
//! Establishes a ground-truth per-instruction latency baseline for
//! each benchmark by linear regression over repeated timed runs, then
//! compares it against the simulator's predicted CPI to produce a
//! calibrated accuracy verdict.
//!
//! # Pipeline
//!
//! ```text
//! HardwareRunner ──► Calibrator ──► CalibrationResult
//!                                        │ normalize_calibrations
//! SuiteCpiRecords ──► merge_suites ──► MergedCpi
//!                                        │
//!                          compare + summarize ──► ComparisonRecord, AccuracySummary
//! ```
//!
//! Suite CPI records are produced by the acquisition harness (the
//! `simcal-harness` crate); everything here is pure logic over value
//! objects. Each stage returns new values — nothing is mutated after
//! creation, which keeps provenance auditable end to end.
//!
//! # Quick start
//!
//! ```no_run
//! use simcal_core::prelude::*;
//! # fn hardware() -> Box<dyn HardwareRunner> { unimplemented!() }
//!
//! # fn main() -> simcal_core::Result<()> {
//! let config = CalibConfig::default();
//! let calibrator = Calibrator::new(&config);
//! let hw = hardware();
//!
//! let result = calibrator.calibrate(hw.as_ref(), "arithmetic", "ALU ops")?;
//! println!(
//!     "{}: {:.4} ns/inst (R²={:.4})",
//!     result.benchmark_id, result.latency_ns_per_instruction, result.r_squared
//! );
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod compare;
pub mod config;
mod error;
pub mod merge;
pub mod normalize;
pub mod regression;
pub mod stats;
pub mod suite;

pub use compare::{
    compare, cpi_to_latency_ns, relative_error, summarize, AccuracySummary, ComparisonRecord,
};
pub use config::{
    AnalyticalBaseline, CalibConfig, NormalizationAdjustment, SuiteTests, TestPair,
};
pub use error::{CalibError, Result};
pub use merge::{merge_suites, suite_rank, MergeOutcome, MergedCpi};
pub use normalize::{normalize_calibrations, normalize_latency};
pub use regression::{CalibrationResult, Calibrator, HardwareRunner, Measurement};
pub use stats::{linear_regression, trimmed_mean, LinearFit};
pub use suite::{Provenance, Suite, SuiteCpiRecord};

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        compare, merge_suites, normalize_calibrations, summarize, AccuracySummary, CalibConfig,
        CalibError, CalibrationResult, Calibrator, ComparisonRecord, HardwareRunner, MergedCpi,
        Provenance, Result, Suite, SuiteCpiRecord,
    };
}
