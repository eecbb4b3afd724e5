//! Accuracy comparison of hardware baselines against merged simulator CPI.
//!
//! Error formula: `|t_sim − t_real| / min(t_sim, t_real)`, +inf when
//! the minimum is exactly zero. Aggregates and the health gate only
//! ever see `calibrated = true` records; analytical estimates and
//! fallback-derived values are displayed, never blended in.

use crate::config::{AnalyticalBaseline, CalibConfig};
use crate::merge::MergedCpi;
use crate::regression::CalibrationResult;
use crate::suite::{Provenance, Suite};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Per-benchmark comparison of hardware baseline and simulator prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    /// Benchmark identifier
    pub benchmark_id: String,
    /// Short human description
    pub description: String,
    /// Hardware latency after normalization, ns per instruction
    pub real_latency_ns: f64,
    /// Simulator latency at the assumed frequency, ns per instruction
    pub sim_latency_ns: f64,
    /// Simulator CPI the latency was derived from
    pub sim_cpi: f64,
    /// Suite the CPI came from
    pub source_suite: Suite,
    /// Whether the CPI was measured live or fallback-substituted
    pub provenance: Provenance,
    /// Relative error, `>= 0` or +inf
    pub error: f64,
    /// True only when the hardware baseline came from an actual regression
    pub calibrated: bool,
}

/// Aggregate verdict over one comparison run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracySummary {
    /// Mean error over calibrated records only
    pub mean_error: Option<f64>,
    /// Max error over calibrated records only
    pub max_error: Option<f64>,
    /// Number of calibrated records
    pub calibrated_count: usize,
    /// Number of uncalibrated (analytical or fallback-tainted) records
    pub uncalibrated_count: usize,
    /// Benchmarks with no simulator CPI at all
    pub missing: Vec<String>,
    /// Calibrated mean error within tolerance (vacuously true when
    /// there are no calibrated records — absence of evidence is
    /// reported through the counts, not as a failure)
    pub healthy: bool,
}

/// Relative error between a simulated and a real latency.
///
/// Symmetric in its arguments; `error(a, a) == 0`; +inf when either
/// value is exactly zero.
#[must_use]
pub fn relative_error(t_sim: f64, t_real: f64) -> f64 {
    let min = t_sim.min(t_real);
    if min == 0.0 {
        return f64::INFINITY;
    }
    (t_sim - t_real).abs() / min
}

/// Convert a CPI to ns per instruction at the assumed frequency.
#[must_use]
pub fn cpi_to_latency_ns(cpi: f64, frequency_ghz: f64) -> f64 {
    cpi / frequency_ghz
}

/// Compare normalized hardware baselines against merged simulator CPI.
///
/// One record per benchmark present in both inputs. Benchmarks with a
/// merged CPI but no hardware baseline fall back to the analytical
/// table when it has an entry (`calibrated = false`), and are skipped
/// with a log line otherwise. Fallback-provenance CPI also demotes a
/// record to uncalibrated: neither side of it was measured.
#[must_use]
pub fn compare(
    calibrations: &[CalibrationResult],
    merged: &BTreeMap<String, MergedCpi>,
    analytical: &BTreeMap<String, AnalyticalBaseline>,
    frequency_ghz: f64,
) -> Vec<ComparisonRecord> {
    let by_benchmark: BTreeMap<&str, &CalibrationResult> = calibrations
        .iter()
        .map(|c| (c.benchmark_id.as_str(), c))
        .collect();

    let mut records = Vec::with_capacity(merged.len());

    for (benchmark, cpi) in merged {
        let (real_latency_ns, description, regressed) =
            match by_benchmark.get(benchmark.as_str()) {
                Some(cal) => (
                    cal.latency_ns_per_instruction,
                    cal.description.clone(),
                    true,
                ),
                None => match analytical.get(benchmark) {
                    Some(baseline) => {
                        (baseline.latency_ns, baseline.description.clone(), false)
                    }
                    None => {
                        warn!(benchmark, "no hardware baseline; skipping comparison");
                        continue;
                    }
                },
            };

        let sim_latency_ns = cpi_to_latency_ns(cpi.cpi, frequency_ghz);
        let error = relative_error(sim_latency_ns, real_latency_ns);
        let calibrated = regressed && cpi.provenance == Provenance::Measured;

        records.push(ComparisonRecord {
            benchmark_id: benchmark.clone(),
            description,
            real_latency_ns,
            sim_latency_ns,
            sim_cpi: cpi.cpi,
            source_suite: cpi.source_suite,
            provenance: cpi.provenance,
            error,
            calibrated,
        });
    }

    records
}

/// Aggregate statistics and the pipeline health verdict.
///
/// Only `calibrated = true` records feed the mean/max; everything
/// else is counted but never averaged in.
#[must_use]
pub fn summarize(
    records: &[ComparisonRecord],
    missing: Vec<String>,
    config: &CalibConfig,
) -> AccuracySummary {
    let calibrated_errors: Vec<f64> = records
        .iter()
        .filter(|r| r.calibrated)
        .map(|r| r.error)
        .collect();

    let (mean_error, max_error) = if calibrated_errors.is_empty() {
        (None, None)
    } else {
        #[allow(clippy::cast_precision_loss)]
        let mean = calibrated_errors.iter().sum::<f64>() / calibrated_errors.len() as f64;
        let max = calibrated_errors.iter().fold(0.0_f64, |a, &b| a.max(b));
        (Some(mean), Some(max))
    };

    let healthy = mean_error.is_none_or(|m| m <= config.mean_error_tolerance);
    if !healthy {
        warn!(
            mean_error = mean_error.unwrap_or(f64::NAN),
            tolerance = config.mean_error_tolerance,
            "calibration pipeline degraded"
        );
    } else if let Some(mean) = mean_error {
        info!(
            mean_error = mean,
            benchmarks = calibrated_errors.len(),
            "calibrated accuracy"
        );
    }

    AccuracySummary {
        mean_error,
        max_error,
        calibrated_count: calibrated_errors.len(),
        uncalibrated_count: records.len() - calibrated_errors.len(),
        missing,
        healthy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::MergedCpi;

    fn calibration(benchmark: &str, latency_ns: f64) -> CalibrationResult {
        CalibrationResult {
            benchmark_id: benchmark.to_string(),
            description: String::new(),
            latency_ns_per_instruction: latency_ns,
            overhead_ms: 1.0,
            r_squared: 0.99,
            data_points: Vec::new(),
        }
    }

    fn merged_cpi(benchmark: &str, cpi: f64, provenance: Provenance) -> (String, MergedCpi) {
        (
            benchmark.to_string(),
            MergedCpi {
                benchmark_id: benchmark.to_string(),
                cpi,
                source_suite: Suite::NoCache,
                provenance,
            },
        )
    }

    #[test]
    fn error_is_symmetric_and_zero_on_equal_inputs() {
        assert!((relative_error(1.5, 3.0) - relative_error(3.0, 1.5)).abs() < 1e-15);
        assert_eq!(relative_error(0.7, 0.7), 0.0);
    }

    #[test]
    fn error_against_zero_is_infinite() {
        assert!(relative_error(1.0, 0.0).is_infinite());
        assert!(relative_error(0.0, 42.0).is_infinite());
    }

    #[test]
    fn matching_latencies_give_near_zero_error() {
        // CPI 1.2 at 3.5 GHz is 0.342857 ns/inst
        let merged: BTreeMap<String, MergedCpi> =
            [merged_cpi("bench", 1.2, Provenance::Measured)].into();
        let records = compare(
            &[calibration("bench", 0.342_857)],
            &merged,
            &BTreeMap::new(),
            3.5,
        );
        assert_eq!(records.len(), 1);
        assert!(records[0].error < 1e-4, "got {}", records[0].error);
        assert!(records[0].calibrated);
    }

    #[test]
    fn doubled_cpi_gives_hundred_percent_error() {
        let merged: BTreeMap<String, MergedCpi> =
            [merged_cpi("bench", 2.4, Provenance::Measured)].into();
        let records = compare(
            &[calibration("bench", 0.342_857)],
            &merged,
            &BTreeMap::new(),
            3.5,
        );
        assert!((records[0].error - 1.0).abs() < 1e-3, "got {}", records[0].error);
    }

    #[test]
    fn fallback_cpi_demotes_record_to_uncalibrated() {
        let merged: BTreeMap<String, MergedCpi> =
            [merged_cpi("bench", 1.2, Provenance::Fallback)].into();
        let records = compare(&[calibration("bench", 0.3)], &merged, &BTreeMap::new(), 3.5);
        assert!(!records[0].calibrated);
    }

    #[test]
    fn analytical_baseline_is_uncalibrated_but_present() {
        let merged: BTreeMap<String, MergedCpi> =
            [merged_cpi("estimated", 2.0, Provenance::Measured)].into();
        let analytical: BTreeMap<String, AnalyticalBaseline> = [(
            "estimated".to_string(),
            AnalyticalBaseline {
                latency_ns: 0.5,
                description: "estimate".to_string(),
            },
        )]
        .into();

        let records = compare(&[], &merged, &analytical, 3.5);
        assert_eq!(records.len(), 1);
        assert!(!records[0].calibrated);
    }

    #[test]
    fn no_baseline_at_all_skips_benchmark() {
        let merged: BTreeMap<String, MergedCpi> =
            [merged_cpi("orphan", 2.0, Provenance::Measured)].into();
        let records = compare(&[], &merged, &BTreeMap::new(), 3.5);
        assert!(records.is_empty());
    }

    #[test]
    fn aggregates_exclude_uncalibrated_records() {
        let records = vec![
            ComparisonRecord {
                benchmark_id: "good".into(),
                description: String::new(),
                real_latency_ns: 1.0,
                sim_latency_ns: 1.1,
                sim_cpi: 3.85,
                source_suite: Suite::NoCache,
                provenance: Provenance::Measured,
                error: 0.1,
                calibrated: true,
            },
            ComparisonRecord {
                benchmark_id: "wild".into(),
                description: String::new(),
                real_latency_ns: 1.0,
                sim_latency_ns: 9.0,
                sim_cpi: 31.5,
                source_suite: Suite::NoCache,
                provenance: Provenance::Fallback,
                error: 8.0,
                calibrated: false,
            },
        ];

        let summary = summarize(&records, Vec::new(), &CalibConfig::default());
        assert_eq!(summary.calibrated_count, 1);
        assert_eq!(summary.uncalibrated_count, 1);
        assert!((summary.mean_error.unwrap() - 0.1).abs() < 1e-12);
        assert!((summary.max_error.unwrap() - 0.1).abs() < 1e-12);
        assert!(summary.healthy);
    }

    #[test]
    fn health_gate_trips_above_tolerance() {
        let records = vec![ComparisonRecord {
            benchmark_id: "bad".into(),
            description: String::new(),
            real_latency_ns: 1.0,
            sim_latency_ns: 4.0,
            sim_cpi: 14.0,
            source_suite: Suite::NoCache,
            provenance: Provenance::Measured,
            error: 3.0,
            calibrated: true,
        }];
        let summary = summarize(&records, Vec::new(), &CalibConfig::default());
        assert!(!summary.healthy);
    }

    #[test]
    fn empty_calibrated_set_is_reported_not_failed() {
        let summary = summarize(&[], vec!["lost".to_string()], &CalibConfig::default());
        assert!(summary.mean_error.is_none());
        assert!(summary.healthy);
        assert_eq!(summary.missing, vec!["lost".to_string()]);
    }
}
