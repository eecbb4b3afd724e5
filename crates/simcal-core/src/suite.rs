//! Benchmark suites and per-suite CPI records.
//!
//! A suite is a named measurement mode of the simulator: the plain
//! microbenchmark run (`no_cache`), the same microbenchmarks with the
//! data cache model enabled (`dcache`), and the two heavier external
//! collections (`polybench`, `embench`). Each suite has its own
//! timeout class and its own applicability rules at merge time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Simulator measurement suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Suite {
    /// Microbenchmarks without cache simulation
    NoCache,
    /// Microbenchmarks with the data cache model enabled
    Dcache,
    /// PolyBench kernels
    Polybench,
    /// EmBench IoT kernels
    Embench,
}

impl Suite {
    /// All suites, in acquisition order.
    pub const ALL: [Self; 4] = [Self::NoCache, Self::Dcache, Self::Polybench, Self::Embench];

    /// Whether this suite belongs to the heavyweight timeout class.
    ///
    /// PolyBench and EmBench run full kernels and need the long
    /// timeout; the microbenchmark suites finish in seconds.
    #[must_use]
    pub const fn is_heavyweight(self) -> bool {
        matches!(self, Self::Polybench | Self::Embench)
    }

    /// Timeout for one simulator invocation in this suite.
    #[must_use]
    pub const fn timeout(self, short_secs: u64, long_secs: u64) -> Duration {
        if self.is_heavyweight() {
            Duration::from_secs(long_secs)
        } else {
            Duration::from_secs(short_secs)
        }
    }
}

impl fmt::Display for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoCache => "no_cache",
            Self::Dcache => "dcache",
            Self::Polybench => "polybench",
            Self::Embench => "embench",
        };
        f.write_str(name)
    }
}

/// How a CPI value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Parsed from a live simulator run
    Measured,
    /// Substituted from the static fallback table after retries were exhausted
    Fallback,
}

/// One CPI value acquired (or fallback-substituted) for a benchmark in a suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteCpiRecord {
    /// Benchmark identifier (calibration-side name)
    pub benchmark_id: String,
    /// Suite that produced the value
    pub suite: Suite,
    /// Cycles per retired instruction, strictly positive
    pub cpi: f64,
    /// Live measurement or static fallback
    pub provenance: Provenance,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_classes() {
        assert!(!Suite::NoCache.is_heavyweight());
        assert!(!Suite::Dcache.is_heavyweight());
        assert!(Suite::Polybench.is_heavyweight());
        assert!(Suite::Embench.is_heavyweight());

        assert_eq!(Suite::Dcache.timeout(120, 600), Duration::from_secs(120));
        assert_eq!(Suite::Embench.timeout(120, 600), Duration::from_secs(600));
    }

    #[test]
    fn suite_names_round_trip_through_json() {
        for suite in Suite::ALL {
            let json = serde_json::to_string(&suite).unwrap();
            let back: Suite = serde_json::from_str(&json).unwrap();
            assert_eq!(suite, back);
        }
        assert_eq!(serde_json::to_string(&Suite::NoCache).unwrap(), "\"no_cache\"");
    }
}
