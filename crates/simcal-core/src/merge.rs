//! Precedence-ordered merge of per-suite CPI records.
//!
//! Each benchmark ends up with exactly one CPI, chosen by fixed
//! precedence — never averaged, never voted. The merge is an explicit
//! reduction over immutable records collected beforehand, so the
//! winning suite and its provenance stay auditable.

use crate::suite::{Provenance, Suite, SuiteCpiRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// The single CPI chosen for a benchmark after precedence resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedCpi {
    /// Benchmark identifier
    pub benchmark_id: String,
    /// Winning CPI value
    pub cpi: f64,
    /// Suite that supplied the value
    pub source_suite: Suite,
    /// Whether the value was measured live or fallback-substituted
    pub provenance: Provenance,
}

/// Outcome of merging all suite records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeOutcome {
    /// One entry per benchmark that at least one suite covered
    pub merged: BTreeMap<String, MergedCpi>,
    /// Benchmarks that were expected but no suite produced, reported
    /// rather than silently dropped
    pub missing: Vec<String>,
}

/// Precedence rank of a suite for one benchmark. Higher wins.
///
/// Fixed order: dcache > polybench > embench > no_cache, with one
/// exception — the dcache suite outranks the rest only for benchmarks
/// in the memory-latency-sensitive set. For all other benchmarks its
/// cache-heavy CPI is misleading and it ranks last instead; no_cache
/// never outranks the external collections either way.
#[must_use]
pub fn suite_rank(suite: Suite, memory_sensitive: bool) -> u8 {
    match (suite, memory_sensitive) {
        (Suite::Dcache, true) => 4,
        (Suite::Dcache, false) => 0,
        (Suite::Polybench, _) => 3,
        (Suite::Embench, _) => 2,
        (Suite::NoCache, _) => 1,
    }
}

/// Merge suite records into one CPI per benchmark.
///
/// `expected` lists every benchmark the run intended to cover;
/// entries absent from all records land in `MergeOutcome::missing`.
/// Insertion order of `records` never affects the result: only rank
/// decides, and within one suite the first record wins (duplicates
/// are logged and ignored).
#[must_use]
pub fn merge_suites(
    records: &[SuiteCpiRecord],
    dcache_benchmarks: &BTreeSet<String>,
    expected: &[String],
) -> MergeOutcome {
    let mut merged: BTreeMap<String, MergedCpi> = BTreeMap::new();
    let mut seen: BTreeSet<(String, Suite)> = BTreeSet::new();

    for record in records {
        if !seen.insert((record.benchmark_id.clone(), record.suite)) {
            warn!(
                benchmark = %record.benchmark_id,
                suite = %record.suite,
                "duplicate record within a suite, ignoring"
            );
            continue;
        }

        let memory_sensitive = dcache_benchmarks.contains(&record.benchmark_id);
        let rank = suite_rank(record.suite, memory_sensitive);

        match merged.get(&record.benchmark_id) {
            Some(current)
                if suite_rank(current.source_suite, memory_sensitive) >= rank =>
            {
                debug!(
                    benchmark = %record.benchmark_id,
                    kept = %current.source_suite,
                    dropped = %record.suite,
                    "lower-precedence record ignored"
                );
            }
            _ => {
                merged.insert(
                    record.benchmark_id.clone(),
                    MergedCpi {
                        benchmark_id: record.benchmark_id.clone(),
                        cpi: record.cpi,
                        source_suite: record.suite,
                        provenance: record.provenance,
                    },
                );
            }
        }
    }

    let missing: Vec<String> = expected
        .iter()
        .filter(|b| !merged.contains_key(*b))
        .cloned()
        .collect();
    for benchmark in &missing {
        warn!(benchmark, "no simulator CPI available");
    }

    MergeOutcome { merged, missing }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(benchmark: &str, suite: Suite, cpi: f64) -> SuiteCpiRecord {
        SuiteCpiRecord {
            benchmark_id: benchmark.to_string(),
            suite,
            cpi,
            provenance: Provenance::Measured,
        }
    }

    fn dcache_set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn dcache_wins_for_memory_sensitive_benchmarks() {
        let records = vec![
            record("memorystrided", Suite::NoCache, 1.1),
            record("memorystrided", Suite::Dcache, 4.2),
        ];
        let outcome = merge_suites(&records, &dcache_set(&["memorystrided"]), &[]);
        let m = &outcome.merged["memorystrided"];
        assert_eq!(m.source_suite, Suite::Dcache);
        assert!((m.cpi - 4.2).abs() < 1e-12);
    }

    #[test]
    fn precedence_ignores_insertion_order() {
        let forward = vec![
            record("memorystrided", Suite::NoCache, 1.1),
            record("memorystrided", Suite::Dcache, 4.2),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let sensitive = dcache_set(&["memorystrided"]);
        let a = merge_suites(&forward, &sensitive, &[]);
        let b = merge_suites(&reversed, &sensitive, &[]);
        assert_eq!(a.merged, b.merged);
        assert_eq!(a.merged["memorystrided"].source_suite, Suite::Dcache);
    }

    #[test]
    fn dcache_ranks_last_for_compute_bound_benchmarks() {
        let records = vec![
            record("arithmetic", Suite::Dcache, 9.9),
            record("arithmetic", Suite::NoCache, 1.2),
        ];
        let outcome = merge_suites(&records, &dcache_set(&[]), &[]);
        assert_eq!(outcome.merged["arithmetic"].source_suite, Suite::NoCache);
    }

    #[test]
    fn polybench_beats_embench() {
        let records = vec![
            record("gemm", Suite::Embench, 2.0),
            record("gemm", Suite::Polybench, 3.0),
        ];
        let outcome = merge_suites(&records, &dcache_set(&[]), &[]);
        assert_eq!(outcome.merged["gemm"].source_suite, Suite::Polybench);
    }

    #[test]
    fn polybench_beats_no_cache_for_non_sensitive_benchmark() {
        let records = vec![
            record("gemm", Suite::NoCache, 1.0),
            record("gemm", Suite::Polybench, 3.0),
        ];
        let outcome = merge_suites(&records, &dcache_set(&[]), &[]);
        assert_eq!(outcome.merged["gemm"].source_suite, Suite::Polybench);
        assert!((outcome.merged["gemm"].cpi - 3.0).abs() < 1e-12);
    }

    #[test]
    fn embench_beats_no_cache_for_non_sensitive_benchmark() {
        let records = vec![
            record("huffbench", Suite::NoCache, 1.0),
            record("huffbench", Suite::Embench, 2.0),
        ];
        let outcome = merge_suites(&records, &dcache_set(&[]), &[]);
        assert_eq!(outcome.merged["huffbench"].source_suite, Suite::Embench);
    }

    #[test]
    fn absent_benchmarks_are_reported_not_dropped() {
        let records = vec![record("arithmetic", Suite::NoCache, 1.2)];
        let expected = vec!["arithmetic".to_string(), "huffbench".to_string()];
        let outcome = merge_suites(&records, &dcache_set(&[]), &expected);
        assert_eq!(outcome.missing, vec!["huffbench".to_string()]);
        assert_eq!(outcome.merged.len(), 1);
    }

    #[test]
    fn duplicate_within_suite_keeps_first() {
        let records = vec![
            record("branch", Suite::NoCache, 2.9),
            record("branch", Suite::NoCache, 5.0),
        ];
        let outcome = merge_suites(&records, &dcache_set(&[]), &[]);
        assert!((outcome.merged["branch"].cpi - 2.9).abs() < 1e-12);
    }

    #[test]
    fn fallback_provenance_survives_merge() {
        let records = vec![SuiteCpiRecord {
            benchmark_id: "branch".to_string(),
            suite: Suite::NoCache,
            cpi: 2.9,
            provenance: Provenance::Fallback,
        }];
        let outcome = merge_suites(&records, &dcache_set(&[]), &[]);
        assert_eq!(outcome.merged["branch"].provenance, Provenance::Fallback);
    }
}
