// SPDX-License-Identifier: AGPL-3.0-only

//! Bounded-retry CPI acquisition.
//!
//! One CPI per `(test_identifier, benchmark_id)` pair per suite,
//! obtained through a small state machine:
//!
//! ```text
//! Pending → Running → Succeeded
//!                   → Failed / TimedOut → Retrying (≤ max_retries)
//!                                       → FallbackUsed | Unavailable
//! ```
//!
//! The transition function is pure data-in data-out; the driver loop
//! just feeds it attempt outcomes and sleeps between retries. A parse
//! failure — the run completed but no well-formed CPI line matched
//! the test identifier — counts as a failed attempt like any other.

use crate::parse::cpi_for_test;
use crate::simulator::{SimAttempt, SimulatorRunner};
use simcal_core::{Provenance, Suite, SuiteCpiRecord, TestPair};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// State of one benchmark's acquisition.
#[derive(Debug, Clone, PartialEq)]
pub enum AcquireState {
    /// Not yet attempted
    Pending,
    /// Attempt `attempt` (0-based) in flight
    Running {
        /// 0-based attempt index
        attempt: u32,
    },
    /// Attempt failed (process error or parse failure)
    Failed {
        /// Attempt that failed
        attempt: u32,
    },
    /// Attempt exceeded the suite timeout
    TimedOut {
        /// Attempt that timed out
        attempt: u32,
    },
    /// Waiting out the backoff before the next attempt
    Retrying {
        /// Attempt about to start
        next_attempt: u32,
    },
    /// A CPI was parsed from live output
    Succeeded {
        /// The measured CPI
        cpi: f64,
    },
    /// Retries exhausted, static fallback substituted
    FallbackUsed {
        /// The fallback CPI
        cpi: f64,
    },
    /// Retries exhausted and no fallback configured
    Unavailable,
}

impl AcquireState {
    /// Whether this state is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded { .. } | Self::FallbackUsed { .. } | Self::Unavailable
        )
    }
}

/// Outcome of one attempt, as seen by the state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttemptOutcome {
    /// A well-formed CPI was parsed
    Success(f64),
    /// Process failure or malformed/missing CPI
    Failure,
    /// The suite timeout expired
    Timeout,
}

/// Record an attempt outcome. Only meaningful from `Running`.
#[must_use]
pub fn observe(state: &AcquireState, outcome: AttemptOutcome) -> AcquireState {
    match (state, outcome) {
        (AcquireState::Running { .. }, AttemptOutcome::Success(cpi)) => {
            AcquireState::Succeeded { cpi }
        }
        (AcquireState::Running { attempt }, AttemptOutcome::Failure) => AcquireState::Failed {
            attempt: *attempt,
        },
        (AcquireState::Running { attempt }, AttemptOutcome::Timeout) => AcquireState::TimedOut {
            attempt: *attempt,
        },
        (other, _) => other.clone(),
    }
}

/// Resolve a failed or timed-out attempt into retry or a terminal state.
#[must_use]
pub fn resolve(state: &AcquireState, max_retries: u32, fallback: Option<f64>) -> AcquireState {
    let attempt = match state {
        AcquireState::Failed { attempt } | AcquireState::TimedOut { attempt } => *attempt,
        other => return other.clone(),
    };

    if attempt < max_retries {
        AcquireState::Retrying {
            next_attempt: attempt + 1,
        }
    } else {
        match fallback {
            Some(cpi) => AcquireState::FallbackUsed { cpi },
            None => AcquireState::Unavailable,
        }
    }
}

/// Everything one suite's acquisition produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteAcquisition {
    /// Records for benchmarks that ended `Succeeded` or `FallbackUsed`
    pub records: Vec<SuiteCpiRecord>,
    /// Benchmarks that ended `Unavailable`
    pub unavailable: Vec<String>,
}

/// Drives the acquisition state machine over a suite's test list.
#[derive(Debug, Clone)]
pub struct SuiteAcquirer {
    max_retries: u32,
    backoff: Duration,
    short_timeout: Duration,
    long_timeout: Duration,
}

impl SuiteAcquirer {
    /// Acquirer with explicit retry and timeout parameters.
    #[must_use]
    pub fn new(
        max_retries: u32,
        backoff: Duration,
        short_timeout: Duration,
        long_timeout: Duration,
    ) -> Self {
        Self {
            max_retries,
            backoff,
            short_timeout,
            long_timeout,
        }
    }

    /// Acquirer configured from the static tables.
    #[must_use]
    pub fn from_config(config: &simcal_core::CalibConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_secs(config.retry_backoff_secs),
            Duration::from_secs(config.short_timeout_secs),
            Duration::from_secs(config.long_timeout_secs),
        )
    }

    /// Acquire one CPI per test pair in `suite`.
    ///
    /// Benchmarks are independent; one pair exhausting its retries
    /// never affects the others.
    pub fn acquire_suite(
        &self,
        sim: &dyn SimulatorRunner,
        suite: Suite,
        tests: &[TestPair],
        fallback_cpis: &BTreeMap<String, f64>,
    ) -> SuiteAcquisition {
        let timeout = suite.timeout(self.short_timeout.as_secs(), self.long_timeout.as_secs());
        info!(%suite, tests = tests.len(), ?timeout, "acquiring suite");

        let mut records = Vec::new();
        let mut unavailable = Vec::new();

        for pair in tests {
            let fallback = fallback_cpis.get(&pair.benchmark_id).copied();
            match self.acquire_one(sim, pair, timeout, fallback) {
                AcquireState::Succeeded { cpi } => {
                    records.push(SuiteCpiRecord {
                        benchmark_id: pair.benchmark_id.clone(),
                        suite,
                        cpi,
                        provenance: Provenance::Measured,
                    });
                }
                AcquireState::FallbackUsed { cpi } => {
                    warn!(
                        benchmark = %pair.benchmark_id,
                        %suite,
                        cpi,
                        "retries exhausted, using fallback CPI"
                    );
                    records.push(SuiteCpiRecord {
                        benchmark_id: pair.benchmark_id.clone(),
                        suite,
                        cpi,
                        provenance: Provenance::Fallback,
                    });
                }
                AcquireState::Unavailable => {
                    warn!(benchmark = %pair.benchmark_id, %suite, "no CPI and no fallback");
                    unavailable.push(pair.benchmark_id.clone());
                }
                // acquire_one only returns terminal states
                other => {
                    debug!(benchmark = %pair.benchmark_id, ?other, "non-terminal final state");
                    unavailable.push(pair.benchmark_id.clone());
                }
            }
        }

        SuiteAcquisition {
            records,
            unavailable,
        }
    }

    fn acquire_one(
        &self,
        sim: &dyn SimulatorRunner,
        pair: &TestPair,
        timeout: Duration,
        fallback: Option<f64>,
    ) -> AcquireState {
        let mut state = AcquireState::Pending;

        loop {
            state = match state {
                AcquireState::Pending => AcquireState::Running { attempt: 0 },
                AcquireState::Retrying { next_attempt } => {
                    if !self.backoff.is_zero() {
                        std::thread::sleep(self.backoff);
                    }
                    AcquireState::Running {
                        attempt: next_attempt,
                    }
                }
                AcquireState::Running { attempt } => {
                    debug!(test = %pair.test_id, attempt, "running simulator");
                    let outcome = self.attempt(sim, pair, timeout);
                    let observed = observe(&AcquireState::Running { attempt }, outcome);
                    resolve(&observed, self.max_retries, fallback)
                }
                terminal => return terminal,
            };

            if state.is_terminal() {
                return state;
            }
        }
    }

    fn attempt(
        &self,
        sim: &dyn SimulatorRunner,
        pair: &TestPair,
        timeout: Duration,
    ) -> AttemptOutcome {
        match sim.run(&pair.test_id, timeout) {
            SimAttempt::Completed { output, exit_code } => {
                // Non-zero exit still gets scanned; partial output is common
                match cpi_for_test(&output, &pair.test_id) {
                    Some(cpi) => AttemptOutcome::Success(cpi),
                    None => {
                        warn!(
                            test = %pair.test_id,
                            ?exit_code,
                            "no well-formed CPI in output, attempt failed"
                        );
                        AttemptOutcome::Failure
                    }
                }
            }
            SimAttempt::TimedOut => {
                warn!(test = %pair.test_id, "simulator attempt timed out");
                AttemptOutcome::Timeout
            }
            SimAttempt::SpawnFailed(reason) => {
                warn!(test = %pair.test_id, reason, "simulator spawn failed");
                AttemptOutcome::Failure
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_from_running_is_terminal() {
        let running = AcquireState::Running { attempt: 0 };
        let state = observe(&running, AttemptOutcome::Success(1.2));
        assert_eq!(state, AcquireState::Succeeded { cpi: 1.2 });
        assert!(state.is_terminal());
    }

    #[test]
    fn failure_retries_until_budget_exhausted() {
        let mut state = AcquireState::Running { attempt: 0 };
        state = observe(&state, AttemptOutcome::Failure);
        assert_eq!(state, AcquireState::Failed { attempt: 0 });

        state = resolve(&state, 2, Some(1.5));
        assert_eq!(state, AcquireState::Retrying { next_attempt: 1 });

        // Second and third failures
        state = observe(&AcquireState::Running { attempt: 1 }, AttemptOutcome::Failure);
        state = resolve(&state, 2, Some(1.5));
        assert_eq!(state, AcquireState::Retrying { next_attempt: 2 });

        state = observe(&AcquireState::Running { attempt: 2 }, AttemptOutcome::Timeout);
        state = resolve(&state, 2, Some(1.5));
        assert_eq!(state, AcquireState::FallbackUsed { cpi: 1.5 });
    }

    #[test]
    fn exhausted_without_fallback_is_unavailable() {
        let state = observe(&AcquireState::Running { attempt: 2 }, AttemptOutcome::Failure);
        assert_eq!(resolve(&state, 2, None), AcquireState::Unavailable);
    }

    #[test]
    fn observe_ignores_non_running_states() {
        let done = AcquireState::Succeeded { cpi: 1.0 };
        assert_eq!(observe(&done, AttemptOutcome::Failure), done);
    }
}
