// SPDX-License-Identifier: AGPL-3.0-only

//! Simulator collaborator seam.
//!
//! The simulator is modeled purely as a process that, given a test
//! identifier, emits text containing CPI lines — or fails, or wedges.
//! `CommandSimulator` drives the real executable; `ScriptedSimulator`
//! replays canned attempt outcomes so the retry machinery is testable
//! without a simulator install (the same role the software backend
//! plays for hardware-free CI elsewhere in the stack).

use crate::process::run_with_timeout;
use simcal_core::CalibError;
use std::time::Duration;
use tracing::debug;

/// Outcome of one simulator invocation attempt.
#[derive(Debug, Clone)]
pub enum SimAttempt {
    /// Process ran to completion; output may still lack a CPI.
    /// A non-zero exit code is allowed — partial output is scanned.
    Completed {
        /// Combined stdout and stderr text
        output: String,
        /// Exit code, `None` when killed by a signal
        exit_code: Option<i32>,
    },
    /// The invocation exceeded its timeout and was killed
    TimedOut,
    /// The process could not be spawned at all
    SpawnFailed(String),
}

/// Drives one simulator run per test identifier.
pub trait SimulatorRunner {
    /// Run the simulator for `test_id`, blocking up to `timeout`.
    fn run(&self, test_id: &str, timeout: Duration) -> SimAttempt;
}

/// Invokes the configured simulator command.
///
/// Occurrences of `{test}` in the argument template are replaced by
/// the test identifier.
#[derive(Debug, Clone)]
pub struct CommandSimulator {
    program: String,
    args_template: Vec<String>,
}

impl CommandSimulator {
    /// Simulator driven by `program` with an argument template.
    #[must_use]
    pub fn new(program: impl Into<String>, args_template: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args_template,
        }
    }

    /// Build a simulator from a full command line (program + args).
    ///
    /// Returns `None` for an empty command.
    #[must_use]
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }
}

impl SimulatorRunner for CommandSimulator {
    fn run(&self, test_id: &str, timeout: Duration) -> SimAttempt {
        let args: Vec<String> = self
            .args_template
            .iter()
            .map(|a| a.replace("{test}", test_id))
            .collect();

        match run_with_timeout(&self.program, &args, test_id, timeout) {
            Ok(output) => {
                debug!(test_id, exit_code = ?output.exit_code, "simulator run complete");
                SimAttempt::Completed {
                    // Some harnesses log CPI lines to stderr
                    output: join_streams(output.stdout, &output.stderr),
                    exit_code: output.exit_code,
                }
            }
            Err(CalibError::Timeout { .. }) => SimAttempt::TimedOut,
            Err(e) => SimAttempt::SpawnFailed(e.to_string()),
        }
    }
}

/// Concatenate the two streams on a line boundary: an unterminated
/// stdout tail must never fuse with stderr's first line.
fn join_streams(mut stdout: String, stderr: &str) -> String {
    if !stdout.is_empty() && !stdout.ends_with('\n') {
        stdout.push('\n');
    }
    stdout.push_str(stderr);
    stdout
}

/// Replays a fixed script of attempts per test identifier.
///
/// Attempts are consumed in order; once the script is exhausted the
/// last entry repeats. Tests use this to exercise every path of the
/// retry state machine deterministically.
#[derive(Debug)]
pub struct ScriptedSimulator {
    scripts: std::sync::Mutex<std::collections::BTreeMap<String, Vec<SimAttempt>>>,
}

impl ScriptedSimulator {
    /// Empty script; every run reports a spawn failure.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scripts: std::sync::Mutex::new(std::collections::BTreeMap::new()),
        }
    }

    /// Queue the attempt outcomes for one test identifier.
    #[must_use]
    pub fn with_script(self, test_id: &str, attempts: Vec<SimAttempt>) -> Self {
        self.scripts
            .lock()
            .expect("script lock")
            .insert(test_id.to_string(), attempts);
        self
    }

    /// Shorthand: a single successful run printing one CPI line.
    #[must_use]
    pub fn with_cpi(self, test_id: &str, cpi: f64) -> Self {
        let output = format!("    {test_id}: CPI={cpi:.3}\n");
        self.with_script(
            test_id,
            vec![SimAttempt::Completed {
                output,
                exit_code: Some(0),
            }],
        )
    }
}

impl Default for ScriptedSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatorRunner for ScriptedSimulator {
    fn run(&self, test_id: &str, _timeout: Duration) -> SimAttempt {
        let mut scripts = self.scripts.lock().expect("script lock");
        match scripts.get_mut(test_id) {
            Some(attempts) if !attempts.is_empty() => {
                if attempts.len() == 1 {
                    attempts[0].clone()
                } else {
                    attempts.remove(0)
                }
            }
            _ => SimAttempt::SpawnFailed(format!("no script for '{test_id}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_template_substitutes_test_id() {
        let sim = CommandSimulator::new(
            "echo",
            vec!["-run".to_string(), "{test}".to_string()],
        );
        let attempt = sim.run("arithmetic_sequential", Duration::from_secs(5));
        match attempt {
            SimAttempt::Completed { output, exit_code } => {
                assert_eq!(exit_code, Some(0));
                assert!(output.contains("arithmetic_sequential"));
            }
            other => panic!("unexpected attempt: {other:?}"),
        }
    }

    #[test]
    fn unterminated_stdout_does_not_fuse_with_stderr() {
        // stdout ends mid-line (no trailing newline) while stderr has
        // diagnostics; the CPI line must survive the concatenation.
        let sim = CommandSimulator::new(
            "sh",
            vec![
                "-c".to_string(),
                "printf '    {test}: CPI=1.500'; echo diagnostics >&2".to_string(),
            ],
        );
        match sim.run("gemm", Duration::from_secs(5)) {
            SimAttempt::Completed { output, .. } => {
                assert_eq!(crate::parse::cpi_for_test(&output, "gemm"), Some(1.5));
            }
            other => panic!("unexpected attempt: {other:?}"),
        }
    }

    #[test]
    fn from_command_rejects_empty() {
        assert!(CommandSimulator::from_command(&[]).is_none());
        assert!(CommandSimulator::from_command(&["sim".to_string()]).is_some());
    }

    #[test]
    fn scripted_attempts_replay_in_order_and_hold_last() {
        let sim = ScriptedSimulator::new().with_script(
            "t",
            vec![
                SimAttempt::TimedOut,
                SimAttempt::Completed {
                    output: "t: CPI=1.0\n".to_string(),
                    exit_code: Some(0),
                },
            ],
        );

        assert!(matches!(sim.run("t", Duration::ZERO), SimAttempt::TimedOut));
        assert!(matches!(sim.run("t", Duration::ZERO), SimAttempt::Completed { .. }));
        // Last entry repeats
        assert!(matches!(sim.run("t", Duration::ZERO), SimAttempt::Completed { .. }));
    }

    #[test]
    fn unscripted_test_is_a_spawn_failure() {
        let sim = ScriptedSimulator::new();
        assert!(matches!(
            sim.run("nope", Duration::ZERO),
            SimAttempt::SpawnFailed(_)
        ));
    }
}
