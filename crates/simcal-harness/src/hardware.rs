//! Native benchmark execution — the hardware collaborator.
//!
//! Each benchmark is compiled ahead of time into one binary per
//! repetition count (`<bench>_native_r<reps>` in the build
//! directory); building them is outside this crate's scope. Running
//! one and timing it by wall clock is the whole job here, plus an
//! optional retired-instruction count per level via the platform
//! counter tool.

use crate::counters::TimeToolCounter;
use crate::process::run_with_timeout;
use simcal_core::{CalibError, HardwareRunner, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Timeout for one native benchmark run. Native kernels finish in
/// milliseconds to seconds; anything past this is wedged.
const RUN_TIMEOUT: Duration = Duration::from_secs(120);

/// Executes pre-built native benchmark binaries.
#[derive(Debug, Clone)]
pub struct NativeBenchmark {
    build_dir: PathBuf,
    counter: Option<TimeToolCounter>,
}

impl NativeBenchmark {
    /// Runner over binaries in `build_dir`, counting instructions
    /// with the platform default tool when possible.
    #[must_use]
    pub fn new(build_dir: impl Into<PathBuf>) -> Self {
        Self {
            build_dir: build_dir.into(),
            counter: Some(TimeToolCounter::platform_default()),
        }
    }

    /// Runner with a custom (or no) instruction counter.
    #[must_use]
    pub fn with_counter(build_dir: impl Into<PathBuf>, counter: Option<TimeToolCounter>) -> Self {
        Self {
            build_dir: build_dir.into(),
            counter,
        }
    }

    /// Path of the binary for one benchmark at one repetition count.
    #[must_use]
    pub fn binary_path(&self, benchmark: &str, reps: u32) -> PathBuf {
        self.build_dir.join(format!("{benchmark}_native_r{reps}"))
    }

    fn resolve(&self, benchmark: &str, reps: u32) -> Result<PathBuf> {
        let path = self.binary_path(benchmark, reps);
        if path.exists() {
            Ok(path)
        } else {
            Err(CalibError::binary_missing(path))
        }
    }
}

impl HardwareRunner for NativeBenchmark {
    fn instruction_count(&self, benchmark: &str, reps: u32) -> Option<u64> {
        let counter = self.counter.as_ref()?;
        let path = self.resolve(benchmark, reps).ok()?;
        let count = counter.count(&path);
        debug!(benchmark, reps, ?count, "instruction count");
        count
    }

    fn timed_run(&self, benchmark: &str, reps: u32) -> Result<Duration> {
        let path = self.resolve(benchmark, reps)?;
        time_binary(&path)
    }
}

/// Run a binary once and return its wall-clock duration, as measured
/// from spawn to exit detection.
///
/// A non-zero exit makes the timing meaningless and is reported as a
/// process failure so the calibrator skips the level.
///
/// # Errors
///
/// `ProcessFailure` on spawn failure or non-zero exit, `Timeout` if
/// the run wedges.
pub fn time_binary(path: &Path) -> Result<Duration> {
    let identifier = path.display().to_string();
    let output = run_with_timeout(&identifier, &[], &identifier, RUN_TIMEOUT)?;
    if !output.success() {
        return Err(CalibError::process_failure(
            identifier,
            format!("exit code {:?}", output.exit_code),
        ));
    }
    Ok(output.elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use simcal_core::HardwareRunner;

    #[test]
    fn missing_binary_reports_build_or_binary_missing() {
        let dir = tempfile::tempdir().unwrap();
        let runner = NativeBenchmark::with_counter(dir.path(), None);

        let err = runner.timed_run("ghostbench", 1000).unwrap_err();
        assert!(matches!(err, CalibError::BuildOrBinaryMissing { .. }));
        // And the counter path degrades silently
        assert_eq!(runner.instruction_count("ghostbench", 1000), None);
    }

    #[test]
    fn binary_path_follows_rep_naming() {
        let runner = NativeBenchmark::with_counter("/tmp/build", None);
        assert_eq!(
            runner.binary_path("crc32", 5000),
            PathBuf::from("/tmp/build/crc32_native_r5000")
        );
    }

    #[test]
    #[cfg(unix)]
    fn times_a_real_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fast_native_r100");
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

        let runner = NativeBenchmark::with_counter(dir.path(), None);
        let elapsed = runner.timed_run("fast", 100).unwrap();
        assert!(elapsed < Duration::from_secs(5));
    }
}
