//! Instruction-count normalization of calibrated latencies.
//!
//! The calibration harness and the simulator can retire a different
//! number of instructions for the same unit of work (a hand-written
//! calibration loop carries its own loop overhead). Before any
//! comparison, a configured per-benchmark adjustment rescales the
//! hardware latency onto the simulator's instruction-count basis.

use crate::config::NormalizationAdjustment;
use crate::regression::CalibrationResult;
use std::collections::BTreeMap;
use tracing::debug;

/// Rescale a latency by one adjustment: `latency × calibration / simulator`.
///
/// Pure; the only entry point the comparator is allowed to feed
/// latencies through.
#[must_use]
pub fn normalize_latency(latency_ns: f64, adjustment: NormalizationAdjustment) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let ratio = adjustment.calibration_instructions_per_unit as f64
        / adjustment.simulator_instructions_per_unit as f64;
    latency_ns * ratio
}

/// Apply the normalization table to a set of calibration results.
///
/// Benchmarks without a configured adjustment pass through unchanged.
/// Produces new results; the inputs are not mutated.
#[must_use]
pub fn normalize_calibrations(
    results: &[CalibrationResult],
    table: &BTreeMap<String, NormalizationAdjustment>,
) -> Vec<CalibrationResult> {
    results
        .iter()
        .map(|r| match table.get(&r.benchmark_id) {
            Some(&adj) => {
                let adjusted = normalize_latency(r.latency_ns_per_instruction, adj);
                debug!(
                    benchmark = %r.benchmark_id,
                    raw_ns = r.latency_ns_per_instruction,
                    adjusted_ns = adjusted,
                    "normalized latency"
                );
                CalibrationResult {
                    latency_ns_per_instruction: adjusted,
                    ..r.clone()
                }
            }
            None => r.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(benchmark: &str, latency_ns: f64) -> CalibrationResult {
        CalibrationResult {
            benchmark_id: benchmark.to_string(),
            description: String::new(),
            latency_ns_per_instruction: latency_ns,
            overhead_ms: 1.0,
            r_squared: 0.999,
            data_points: Vec::new(),
        }
    }

    #[test]
    fn rescales_by_instruction_count_ratio() {
        // 20 calibration-side instructions correspond to 23 simulator-side
        let adjusted = normalize_latency(
            2.3,
            NormalizationAdjustment {
                calibration_instructions_per_unit: 20,
                simulator_instructions_per_unit: 23,
            },
        );
        assert!((adjusted - 2.0).abs() < 1e-9, "got {adjusted}");
    }

    #[test]
    fn benchmarks_without_adjustment_pass_through() {
        let mut table = BTreeMap::new();
        table.insert(
            "adjusted".to_string(),
            NormalizationAdjustment {
                calibration_instructions_per_unit: 20,
                simulator_instructions_per_unit: 23,
            },
        );

        let out = normalize_calibrations(&[result("adjusted", 2.3), result("plain", 1.7)], &table);

        assert!((out[0].latency_ns_per_instruction - 2.0).abs() < 1e-9);
        assert!((out[1].latency_ns_per_instruction - 1.7).abs() < 1e-12);
        // Everything but the latency survives untouched
        assert_eq!(out[0].r_squared, 0.999);
    }

    #[test]
    fn identity_adjustment_is_a_no_op() {
        let adjusted = normalize_latency(
            0.5,
            NormalizationAdjustment {
                calibration_instructions_per_unit: 40,
                simulator_instructions_per_unit: 40,
            },
        );
        assert!((adjusted - 0.5).abs() < 1e-12);
    }
}
