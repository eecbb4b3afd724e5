//! Static configuration tables.
//!
//! Everything hand-tuned lives here as data: the benchmark name
//! mapping, per-suite test lists, fallback CPI table, the
//! instructions-per-rep table used when hardware counters are
//! unavailable, the loop-overhead normalization table, the
//! memory-latency-sensitive benchmark set, and the regression /
//! retry / timeout parameters. The algorithms never embed any of
//! these; swapping a JSON file swaps the whole generation of
//! constants.
//!
//! The normalization and dcache tables are tied to a specific
//! hardware and benchmark generation. `validate()` checks their
//! shape but deliberately never invents entries for benchmarks it
//! has not seen.

use crate::error::{CalibError, Result};
use crate::suite::Suite;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Instruction-count correction for one benchmark.
///
/// The hand-written calibration loop and the simulator's executed
/// binary retire a different number of instructions per unit of
/// equivalent work (loop overhead, mostly). The adjusted hardware
/// latency is `latency × calibration / simulator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationAdjustment {
    /// Instructions per unit of work as the calibration harness counts them
    pub calibration_instructions_per_unit: u64,
    /// Instructions per unit of work as the simulator counts them
    pub simulator_instructions_per_unit: u64,
}

/// A latency baseline that was estimated analytically, not regressed.
///
/// Used when live calibration is impossible for a benchmark; the
/// resulting comparison records carry `calibrated = false` and stay
/// out of every aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticalBaseline {
    /// Estimated latency in ns per instruction
    pub latency_ns: f64,
    /// Short human description of the benchmark
    #[serde(default)]
    pub description: String,
}

/// One simulator test to run: the identifier the simulator knows and
/// the calibration-side benchmark it measures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestPair {
    /// Identifier as it appears in the simulator's output lines
    pub test_id: String,
    /// Calibration-side benchmark name
    pub benchmark_id: String,
}

/// Tests belonging to one suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteTests {
    /// Which suite these tests run under
    pub suite: Suite,
    /// The `(test_id, benchmark_id)` pairs to acquire
    pub tests: Vec<TestPair>,
}

/// Complete static configuration for a calibration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibConfig {
    /// Repetition counts for the regression schedule, strictly increasing
    pub rep_counts: Vec<u32>,
    /// Timed runs per repetition level
    pub runs: u32,
    /// Untimed warmup runs per repetition level
    pub warmup: u32,
    /// Fraction trimmed from each end before averaging timed runs
    pub trim_pct: f64,

    /// Known instructions per `benchmark()` call, measured locally.
    /// Fallback x-axis scale when hardware counters are unavailable.
    pub insts_per_rep: BTreeMap<String, u64>,
    /// Scale used for benchmarks missing from `insts_per_rep`
    pub default_insts_per_rep: u64,

    /// Simulator test identifier → calibration benchmark name
    pub name_mapping: BTreeMap<String, String>,
    /// Per-suite test lists for acquisition
    pub suite_tests: Vec<SuiteTests>,
    /// Static fallback CPI per benchmark, used after retries are exhausted
    pub fallback_cpis: BTreeMap<String, f64>,
    /// Benchmarks whose behavior is dominated by data-cache latency
    pub dcache_benchmarks: BTreeSet<String>,
    /// Per-benchmark instruction-count corrections
    pub normalization: BTreeMap<String, NormalizationAdjustment>,
    /// Analytical (non-regressed) latency baselines
    pub analytical_baselines: BTreeMap<String, AnalyticalBaseline>,
    /// Human descriptions keyed by benchmark name
    pub descriptions: BTreeMap<String, String>,

    /// Assumed core frequency for CPI → ns conversion
    pub frequency_ghz: f64,
    /// Retry attempts after the first failure
    pub max_retries: u32,
    /// Seconds to sleep between attempts
    pub retry_backoff_secs: u64,
    /// Timeout for lightweight suites (no_cache, dcache)
    pub short_timeout_secs: u64,
    /// Timeout for heavyweight suites (polybench, embench)
    pub long_timeout_secs: u64,
    /// Calibrated-only mean error above this marks the pipeline degraded
    pub mean_error_tolerance: f64,
}

impl Default for CalibConfig {
    fn default() -> Self {
        Self {
            rep_counts: vec![100, 500, 1000, 5000, 10_000, 50_000],
            runs: 15,
            warmup: 3,
            trim_pct: 0.2,
            insts_per_rep: default_insts_per_rep(),
            default_insts_per_rep: 30_000,
            name_mapping: default_name_mapping(),
            suite_tests: Vec::new(),
            fallback_cpis: default_fallback_cpis(),
            dcache_benchmarks: default_dcache_benchmarks(),
            normalization: BTreeMap::new(),
            analytical_baselines: BTreeMap::new(),
            descriptions: default_descriptions(),
            frequency_ghz: 3.5,
            max_retries: 2,
            retry_backoff_secs: 5,
            short_timeout_secs: 120,
            long_timeout_secs: 600,
            mean_error_tolerance: 2.0,
        }
    }
}

impl CalibConfig {
    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid
    /// JSON, or fails `validate()`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error on serialization failure (should not happen
    /// for a well-formed config).
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Schema check for the hand-tuned tables.
    ///
    /// # Errors
    ///
    /// Returns `CalibError::InvalidConfig` naming the first offending
    /// field.
    pub fn validate(&self) -> Result<()> {
        if self.rep_counts.len() < 3 {
            return Err(CalibError::invalid_config(format!(
                "rep_counts needs >=3 entries, got {}",
                self.rep_counts.len()
            )));
        }
        if !self.rep_counts.windows(2).all(|w| w[0] < w[1]) {
            return Err(CalibError::invalid_config(
                "rep_counts must be strictly increasing",
            ));
        }
        if self.rep_counts.iter().any(|&r| r == 0) {
            return Err(CalibError::invalid_config("rep_counts entries must be > 0"));
        }
        if self.runs == 0 {
            return Err(CalibError::invalid_config("runs must be > 0"));
        }
        if !(0.0..0.5).contains(&self.trim_pct) {
            return Err(CalibError::invalid_config(format!(
                "trim_pct must be in [0, 0.5), got {}",
                self.trim_pct
            )));
        }
        if self.frequency_ghz <= 0.0 {
            return Err(CalibError::invalid_config(format!(
                "frequency_ghz must be > 0, got {}",
                self.frequency_ghz
            )));
        }
        if self.default_insts_per_rep == 0 {
            return Err(CalibError::invalid_config(
                "default_insts_per_rep must be > 0",
            ));
        }
        for (bench, &cpi) in &self.fallback_cpis {
            if cpi <= 0.0 || !cpi.is_finite() {
                return Err(CalibError::invalid_config(format!(
                    "fallback CPI for '{bench}' must be a positive finite number, got {cpi}"
                )));
            }
        }
        for (bench, &ipr) in &self.insts_per_rep {
            if ipr == 0 {
                return Err(CalibError::invalid_config(format!(
                    "insts_per_rep for '{bench}' must be > 0"
                )));
            }
        }
        for (bench, adj) in &self.normalization {
            if adj.calibration_instructions_per_unit == 0
                || adj.simulator_instructions_per_unit == 0
            {
                return Err(CalibError::invalid_config(format!(
                    "normalization for '{bench}' must have positive instruction counts"
                )));
            }
        }
        for (bench, baseline) in &self.analytical_baselines {
            if baseline.latency_ns <= 0.0 || !baseline.latency_ns.is_finite() {
                return Err(CalibError::invalid_config(format!(
                    "analytical baseline for '{bench}' must be a positive finite latency"
                )));
            }
        }
        if self.mean_error_tolerance <= 0.0 {
            return Err(CalibError::invalid_config(
                "mean_error_tolerance must be > 0",
            ));
        }
        Ok(())
    }

    /// Description for a benchmark, empty string if none configured.
    #[must_use]
    pub fn description(&self, benchmark: &str) -> String {
        self.descriptions.get(benchmark).cloned().unwrap_or_default()
    }

    /// Instructions-per-rep scale for a benchmark.
    ///
    /// Benchmarks missing from the table use the configured default;
    /// callers on the fallback regression path log this.
    #[must_use]
    pub fn insts_per_rep_for(&self, benchmark: &str) -> u64 {
        self.insts_per_rep
            .get(benchmark)
            .copied()
            .unwrap_or(self.default_insts_per_rep)
    }
}

// Defaults below mirror the measured constants the project has
// carried since the native calibration harness was first built.
// They are a starting point, not ground truth for new silicon.

fn default_insts_per_rep() -> BTreeMap<String, u64> {
    [
        ("aha-mont64", 22_753),
        ("crc32", 13_156),
        ("edn", 34_802),
        ("huffbench", 74_965),
        ("matmult-int", 36_270),
        ("statemate", 21_603),
        ("primecount", 15_233),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn default_name_mapping() -> BTreeMap<String, String> {
    [
        ("arithmetic_sequential", "arithmetic"),
        ("dependency_chain", "dependency"),
        ("branch_taken_conditional", "branch"),
        ("memory_strided", "memorystrided"),
        ("load_heavy", "loadheavy"),
        ("store_heavy", "storeheavy"),
        ("branch_heavy", "branchheavy"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_fallback_cpis() -> BTreeMap<String, f64> {
    [
        ("arithmetic", 1.2),
        ("dependency", 2.2),
        ("branch", 2.9),
        ("memorystrided", 1.5),
        ("loadheavy", 1.3),
        ("storeheavy", 1.2),
        ("branchheavy", 2.0),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn default_dcache_benchmarks() -> BTreeSet<String> {
    ["memorystrided", "loadheavy", "storeheavy", "strideindirect"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_descriptions() -> BTreeMap<String, String> {
    [
        ("aha-mont64", "Montgomery multiplication (cryptographic)"),
        ("crc32", "Cyclic redundancy check (bit manipulation)"),
        ("edn", "Finite impulse response filter (DSP)"),
        ("huffbench", "Huffman compression/decompression"),
        ("matmult-int", "Integer matrix multiplication"),
        ("statemate", "Car window lift state machine"),
        ("primecount", "Prime number sieve"),
        ("arithmetic", "Independent ALU operations"),
        ("dependency", "Serial dependency chain"),
        ("branch", "Taken conditional branches"),
        ("memorystrided", "Strided memory access"),
        ("loadheavy", "Load-dominated kernel"),
        ("storeheavy", "Store-dominated kernel"),
        ("branchheavy", "Branch-dominated kernel"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
