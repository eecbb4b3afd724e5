//! Regression calibration of per-instruction hardware latency.
//!
//! Repeated timed runs at increasing repetition counts separate fixed
//! process-startup overhead from true per-instruction cost: fitting
//! `time_ms` against retired instructions, the slope (×1e6) is the
//! latency in ns/instruction and the intercept is the overhead.
//!
//! When the platform exposes no retired-instruction counter, the fit
//! runs against repetition counts instead and the slope is divided by
//! the benchmark's known instructions-per-rep scale. That path is
//! lower-confidence and stays visible downstream: its `data_points`
//! carry no instruction counts.

use crate::config::CalibConfig;
use crate::error::{CalibError, Result};
use crate::stats::{linear_regression, trimmed_mean};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Hardware collaborator seam.
///
/// The production implementation executes a per-reps native binary;
/// tests supply synthetic linear timings. Both the counter query and
/// the timed run block until done — timeouts belong to the caller's
/// implementation, not this trait.
pub trait HardwareRunner {
    /// Retired-instruction count for one run at `reps`, when the
    /// platform counter interface is available. `None` is a
    /// degradation, not an error.
    fn instruction_count(&self, benchmark: &str, reps: u32) -> Option<u64>;

    /// One run at `reps`, timed by wall clock.
    ///
    /// # Errors
    ///
    /// Returns `CalibError::BuildOrBinaryMissing` (or a process
    /// failure) when the binary for this repetition level is
    /// unusable; the calibrator skips the level and continues.
    fn timed_run(&self, benchmark: &str, reps: u32) -> Result<Duration>;
}

/// One timed trial at a given repetition count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Repetition count compiled into / passed to the binary
    pub reps: u32,
    /// Retired instructions for one run, when counters were available
    pub instructions: Option<u64>,
    /// Trimmed-mean wall-clock time across the timed runs, in ms
    pub time_ms: f64,
}

/// Calibrated hardware baseline for one benchmark.
///
/// Immutable once created; creation fails below 3 usable data points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    /// Benchmark identifier
    pub benchmark_id: String,
    /// Short human description
    pub description: String,
    /// Regression slope converted to ns per instruction
    pub latency_ns_per_instruction: f64,
    /// Regression intercept: fixed overhead per run, in ms
    pub overhead_ms: f64,
    /// Fit quality, in `[0, 1]`
    pub r_squared: f64,
    /// The measurements the fit was computed from, in schedule order
    pub data_points: Vec<Measurement>,
}

impl CalibrationResult {
    /// Whether the fit used real instruction counts (as opposed to
    /// the reps-based fallback scale).
    #[must_use]
    pub fn counter_based(&self) -> bool {
        self.data_points
            .iter()
            .filter(|m| m.instructions.is_some())
            .count()
            >= 3
    }

    /// CPI this latency implies at the given core frequency.
    #[must_use]
    pub fn implied_cpi(&self, frequency_ghz: f64) -> f64 {
        self.latency_ns_per_instruction * frequency_ghz
    }
}

/// Drives a `HardwareRunner` over the repetition schedule and fits
/// the latency regression.
#[derive(Debug, Clone)]
pub struct Calibrator {
    rep_counts: Vec<u32>,
    runs: u32,
    warmup: u32,
    trim_pct: f64,
    insts_per_rep: std::collections::BTreeMap<String, u64>,
    default_insts_per_rep: u64,
}

impl Calibrator {
    /// Build a calibrator from the static configuration.
    #[must_use]
    pub fn new(config: &CalibConfig) -> Self {
        Self {
            rep_counts: config.rep_counts.clone(),
            runs: config.runs,
            warmup: config.warmup,
            trim_pct: config.trim_pct,
            insts_per_rep: config.insts_per_rep.clone(),
            default_insts_per_rep: config.default_insts_per_rep,
        }
    }

    /// Calibrate one benchmark.
    ///
    /// Repetition levels whose binary is missing or fails are skipped;
    /// the benchmark as a whole fails only when fewer than 3 levels
    /// produced a measurement.
    ///
    /// # Errors
    ///
    /// Returns `CalibError::InsufficientDataPoints` when fewer than 3
    /// usable data points were collected. This is terminal for the
    /// benchmark and is not retried.
    pub fn calibrate(
        &self,
        hw: &dyn HardwareRunner,
        benchmark: &str,
        description: &str,
    ) -> Result<CalibrationResult> {
        info!(benchmark, "calibrating");

        let mut data_points = Vec::with_capacity(self.rep_counts.len());

        for &reps in &self.rep_counts {
            match self.measure_level(hw, benchmark, reps) {
                Ok(m) => {
                    debug!(
                        benchmark,
                        reps,
                        instructions = ?m.instructions,
                        time_ms = m.time_ms,
                        "level measured"
                    );
                    data_points.push(m);
                }
                Err(e) => {
                    warn!(benchmark, reps, error = %e, "skipping repetition level");
                }
            }
        }

        if data_points.len() < 3 {
            return Err(CalibError::InsufficientDataPoints {
                benchmark: benchmark.to_string(),
                got: data_points.len(),
            });
        }

        let result = self.fit(benchmark, description, data_points);
        info!(
            benchmark,
            latency_ns = result.latency_ns_per_instruction,
            overhead_ms = result.overhead_ms,
            r_squared = result.r_squared,
            counter_based = result.counter_based(),
            "calibration complete"
        );
        Ok(result)
    }

    /// Warmup runs, timed runs, trimmed mean. One `Measurement` per
    /// repetition level.
    fn measure_level(
        &self,
        hw: &dyn HardwareRunner,
        benchmark: &str,
        reps: u32,
    ) -> Result<Measurement> {
        let instructions = hw.instruction_count(benchmark, reps);

        for _ in 0..self.warmup {
            let _ = hw.timed_run(benchmark, reps)?;
        }

        let mut times_ms = Vec::with_capacity(self.runs as usize);
        for _ in 0..self.runs {
            let elapsed = hw.timed_run(benchmark, reps)?;
            times_ms.push(elapsed.as_secs_f64() * 1e3);
        }

        Ok(Measurement {
            reps,
            instructions,
            time_ms: trimmed_mean(&times_ms, self.trim_pct),
        })
    }

    fn fit(
        &self,
        benchmark: &str,
        description: &str,
        data_points: Vec<Measurement>,
    ) -> CalibrationResult {
        let with_counts: Vec<&Measurement> = data_points
            .iter()
            .filter(|m| m.instructions.is_some())
            .collect();

        let (latency_ns, overhead_ms, r_squared) = if with_counts.len() >= 3 {
            // ms per instruction × 1e6 = ns per instruction
            #[allow(clippy::cast_precision_loss)]
            let x: Vec<f64> = with_counts
                .iter()
                .map(|m| m.instructions.unwrap_or(0) as f64)
                .collect();
            let y: Vec<f64> = with_counts.iter().map(|m| m.time_ms).collect();
            let fit = linear_regression(&x, &y);
            (fit.slope * 1e6, fit.intercept, fit.r_squared)
        } else {
            // Counter-less fallback: regress on reps, rescale by the
            // static instructions-per-rep table.
            let ipr = self
                .insts_per_rep
                .get(benchmark)
                .copied()
                .unwrap_or_else(|| {
                    warn!(
                        benchmark,
                        default = self.default_insts_per_rep,
                        "no instructions-per-rep entry; using default scale"
                    );
                    self.default_insts_per_rep
                });
            warn!(benchmark, insts_per_rep = ipr, "no counters; reps-based regression");

            let x: Vec<f64> = data_points.iter().map(|m| f64::from(m.reps)).collect();
            let y: Vec<f64> = data_points.iter().map(|m| m.time_ms).collect();
            let fit = linear_regression(&x, &y);
            #[allow(clippy::cast_precision_loss)]
            let latency = fit.slope / ipr as f64 * 1e6;
            (latency, fit.intercept, fit.r_squared)
        };

        CalibrationResult {
            benchmark_id: benchmark.to_string(),
            description: description.to_string(),
            latency_ns_per_instruction: latency_ns,
            overhead_ms,
            r_squared,
            data_points,
        }
    }
}
