//! Blocking subprocess execution with an explicit deadline.
//!
//! Both collaborators are external executables. Invocations block,
//! a timeout cancels only that invocation (the child is killed), and
//! output is captured even when the process exits non-zero — the
//! simulator routinely produces usable CPI lines before failing.

use simcal_core::{CalibError, Result};
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Poll interval while waiting for a child to exit. Must stay well
/// below the shortest timed benchmark run, or exit-detection
/// quantization leaks into every wall-clock sample the regression
/// sees.
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Captured outcome of one subprocess invocation.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    /// Exit code, `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    /// Everything the child wrote to stdout
    pub stdout: String,
    /// Everything the child wrote to stderr
    pub stderr: String,
    /// Wall-clock duration of the invocation
    pub elapsed: Duration,
}

impl ProcessOutput {
    /// Whether the child exited with status 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Run a command to completion, enforcing `timeout`.
///
/// On expiry the child is killed and reaped, and `CalibError::Timeout`
/// is returned; the caller's retry machinery decides what happens
/// next. Spawn failures map to `CalibError::ProcessFailure`.
///
/// # Errors
///
/// `Timeout` on deadline expiry, `ProcessFailure` when the command
/// cannot be spawned.
pub fn run_with_timeout(
    program: &str,
    args: &[String],
    identifier: &str,
    timeout: Duration,
) -> Result<ProcessOutput> {
    debug!(identifier, program, ?args, ?timeout, "spawning");
    let start = Instant::now();

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| CalibError::process_failure(identifier, format!("spawn failed: {e}")))?;

    // Drain pipes on threads so a chatty child never deadlocks
    // against a full pipe buffer while we poll for exit.
    let stdout_handle = spawn_reader(child.stdout.take());
    let stderr_handle = spawn_reader(child.stderr.take());

    let deadline = start + timeout;
    let (exit_code, elapsed) = loop {
        match child.try_wait() {
            // Capture elapsed at exit detection, before the reader
            // joins, so pipe draining never inflates the timing.
            Ok(Some(status)) => break (status.code(), start.elapsed()),
            Ok(None) => {
                if Instant::now() >= deadline {
                    kill_and_reap(&mut child, identifier);
                    // Join readers so partial output is not leaked mid-write,
                    // then report the timeout.
                    let _ = stdout_handle.join();
                    let _ = stderr_handle.join();
                    return Err(CalibError::Timeout {
                        identifier: identifier.to_string(),
                        timeout_secs: timeout.as_secs(),
                    });
                }
                std::thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                return Err(CalibError::process_failure(
                    identifier,
                    format!("wait failed: {e}"),
                ));
            }
        }
    };

    let stdout = stdout_handle.join().unwrap_or_default();
    let stderr = stderr_handle.join().unwrap_or_default();

    debug!(identifier, ?exit_code, elapsed_ms = elapsed.as_millis(), "process finished");

    Ok(ProcessOutput {
        exit_code,
        stdout,
        stderr,
        elapsed,
    })
}

fn spawn_reader<R: Read + Send + 'static>(
    source: Option<R>,
) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut reader) = source {
            let _ = reader.read_to_string(&mut buf);
        }
        buf
    })
}

fn kill_and_reap(child: &mut Child, identifier: &str) {
    warn!(identifier, "deadline expired, killing child");
    if let Err(e) = child.kill() {
        warn!(identifier, error = %e, "kill failed");
    }
    let _ = child.wait();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_output_of_successful_command() {
        let out = run_with_timeout(
            "echo",
            &["hello".to_string()],
            "echo-test",
            Duration::from_secs(10),
        )
        .unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "hello");
    }

    #[test]
    fn nonzero_exit_still_yields_output() {
        let out = run_with_timeout(
            "sh",
            &["-c".to_string(), "echo partial; exit 3".to_string()],
            "failing",
            Duration::from_secs(10),
        )
        .unwrap();
        assert!(!out.success());
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(out.stdout.trim(), "partial");
    }

    #[test]
    fn elapsed_tracks_a_fast_exit_closely() {
        // A near-instant command must not report tens of milliseconds
        // of exit-detection latency.
        let out = run_with_timeout("true", &[], "instant", Duration::from_secs(5)).unwrap();
        assert!(
            out.elapsed < Duration::from_millis(40),
            "elapsed {:?}",
            out.elapsed
        );
    }

    #[test]
    fn slow_command_times_out() {
        let err = run_with_timeout(
            "sleep",
            &["30".to_string()],
            "sleeper",
            Duration::from_millis(200),
        )
        .unwrap_err();
        assert!(matches!(err, CalibError::Timeout { .. }));
    }

    #[test]
    fn missing_binary_is_a_process_failure() {
        let err = run_with_timeout(
            "definitely-not-a-real-binary-xyz",
            &[],
            "ghost",
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(err, CalibError::ProcessFailure { .. }));
    }
}
