//! Retired-instruction counting via an external time tool.
//!
//! On platforms where `/usr/bin/time -lp` (or an equivalent wrapper)
//! reports retired instructions, one extra run per repetition level
//! gives the regression a real instruction-count axis. Anywhere else
//! the count is simply absent and calibration degrades to the
//! reps-based fallback — never an error.

use crate::process::run_with_timeout;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Default counting timeout; a single counted run should be far
/// quicker than any suite timeout.
const COUNT_TIMEOUT: Duration = Duration::from_secs(120);

/// Counts retired instructions for a binary by scanning the stderr of
/// a platform time tool.
#[derive(Debug, Clone)]
pub struct TimeToolCounter {
    tool: String,
    args: Vec<String>,
}

impl TimeToolCounter {
    /// Counter invoking `/usr/bin/time -lp <binary>`.
    #[must_use]
    pub fn platform_default() -> Self {
        Self {
            tool: "/usr/bin/time".to_string(),
            args: vec!["-lp".to_string()],
        }
    }

    /// Counter invoking a custom wrapper tool.
    #[must_use]
    pub fn new(tool: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            tool: tool.into(),
            args,
        }
    }

    /// Retired instructions for one run of `binary`, if the tool
    /// reports them. Any failure — tool missing, counter output
    /// absent — returns `None`.
    #[must_use]
    pub fn count(&self, binary: &Path) -> Option<u64> {
        let mut args = self.args.clone();
        args.push(binary.display().to_string());

        let output = run_with_timeout(
            &self.tool,
            &args,
            &format!("count:{}", binary.display()),
            COUNT_TIMEOUT,
        )
        .ok()?;

        let count = parse_instruction_count(&output.stderr);
        if count.is_none() {
            debug!(binary = %binary.display(), "no retired-instruction line in tool output");
        }
        count
    }
}

/// Scan time-tool stderr for a retired-instruction line.
///
/// Accepts both the `NNN instructions retired` format and the
/// `instructions_retired NNN` counter-dump format.
#[must_use]
pub fn parse_instruction_count(stderr: &str) -> Option<u64> {
    for line in stderr.lines() {
        let stripped = line.trim();
        if stripped.contains("instructions retired") {
            if let Some(first) = stripped.split_whitespace().next() {
                if let Ok(n) = first.parse::<u64>() {
                    return Some(n);
                }
            }
        }
        if stripped.contains("instructions_retired") {
            for token in stripped.split_whitespace() {
                if let Ok(n) = token.parse::<u64>() {
                    return Some(n);
                }
            }
        }
    }
    None
}
