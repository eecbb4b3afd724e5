//! Collaborator boundary for the calibration pipeline.
//!
//! `simcal-core` works on value objects; everything that touches the
//! outside world lives here:
//!
//! - [`hardware`] — runs pre-built native benchmark binaries and
//!   times them (the `HardwareRunner` implementation)
//! - [`counters`] — optional retired-instruction counts via a
//!   platform time tool
//! - [`simulator`] — drives the simulator executable with a timeout
//! - [`parse`] — extracts `<label>: CPI=<float>` pairs from raw text
//! - [`acquire`] — the bounded-retry acquisition state machine
//! - [`process`] — blocking subprocess execution with kill-on-deadline
//!
//! All collaborator calls are blocking and carry an explicit timeout;
//! a timeout cancels one invocation and feeds the retry machine, it
//! never aborts the batch.

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]

pub mod acquire;
pub mod counters;
pub mod hardware;
pub mod parse;
pub mod process;
pub mod simulator;

pub use acquire::{
    observe, resolve, AcquireState, AttemptOutcome, SuiteAcquirer, SuiteAcquisition,
};
pub use counters::{parse_instruction_count, TimeToolCounter};
pub use hardware::{time_binary, NativeBenchmark};
pub use parse::{cpi_for_test, scan_cpi_lines};
pub use process::{run_with_timeout, ProcessOutput};
pub use simulator::{CommandSimulator, ScriptedSimulator, SimAttempt, SimulatorRunner};
